//! Manifest files: a saved [`FeatureSnapshot`] that can stand in for a live
//! source host.
//!
//! The on-disk format is a pretty-printed JSON document:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "host": "srv01",
//!   "captured_at": "2026-10-15T08:30:00Z",
//!   "features": [ { "name": "Web-Server", "installed": true, ... } ]
//! }
//! ```

use crate::error::{Error, Result};
use crate::types::{FeatureRecord, FeatureSnapshot, Host};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Current manifest format version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct ManifestFile {
    format_version: u32,
    host: Host,
    captured_at: DateTime<Utc>,
    features: Vec<FeatureRecord>,
}

/// Load a snapshot from a manifest file.
pub fn load_manifest(path: &Path) -> Result<FeatureSnapshot> {
    let fail = |message: String| Error::ManifestLoadFailed {
        path: path.to_path_buf(),
        message,
    };

    let content = fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
    let file: ManifestFile = serde_json::from_str(&content).map_err(|e| fail(e.to_string()))?;

    if file.format_version != FORMAT_VERSION {
        return Err(fail(format!(
            "unsupported format version {} (expected {})",
            file.format_version, FORMAT_VERSION
        )));
    }

    if let Some(dup) = first_duplicate(&file.features) {
        return Err(fail(format!("duplicate feature name: {dup}")));
    }

    log::debug!(
        "Loaded manifest {} ({} features from {})",
        path.display(),
        file.features.len(),
        file.host
    );

    Ok(FeatureSnapshot {
        host: file.host,
        captured_at: file.captured_at,
        features: file.features,
    })
}

fn first_duplicate(features: &[FeatureRecord]) -> Option<String> {
    let mut seen = HashSet::new();
    features
        .iter()
        .find(|f| !seen.insert(f.name.as_str()))
        .map(|f| f.name.clone())
}

/// Save a snapshot as a manifest file, creating parent directories.
pub fn save_manifest(snapshot: &FeatureSnapshot, path: &Path) -> Result<()> {
    let fail = |message: String| Error::ManifestSaveFailed {
        path: path.to_path_buf(),
        message,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
    }

    let file = ManifestFile {
        format_version: FORMAT_VERSION,
        host: snapshot.host.clone(),
        captured_at: snapshot.captured_at,
        features: snapshot.features.clone(),
    };
    let content = serde_json::to_string_pretty(&file).map_err(|e| fail(e.to_string()))?;
    fs::write(path, content).map_err(|e| fail(e.to_string()))?;

    log::debug!("Saved manifest {}", path.display());
    Ok(())
}
