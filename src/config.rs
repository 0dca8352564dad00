use anyhow::{Context, Result};
use featurekit::{Host, RetryConfig};
use reconcile::{DEFAULT_THROTTLE, ExclusionSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;

// ============================================================================
// Config file
// ============================================================================

/// Settings read from `config.toml`.
///
/// Every key is optional; a missing file is the same as an empty one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesyncConfig {
    /// Maximum hosts reconciled at once
    pub throttle: usize,
    /// PowerShell executable to run
    pub shell: Option<String>,
    /// Names never installed by `sync`
    pub install_exclude: Vec<String>,
    /// Names never removed by `sync`
    pub remove_exclude: Vec<String>,
    /// Targets used when none are given on the command line
    pub targets: Vec<String>,
    /// Where to export live source snapshots
    pub export_path: Option<String>,
    /// Remoting retry policy
    pub retry: RetrySettings,
}

impl Default for RolesyncConfig {
    fn default() -> Self {
        Self {
            throttle: DEFAULT_THROTTLE,
            shell: None,
            install_exclude: Vec::new(),
            remove_exclude: Vec::new(),
            targets: Vec::new(),
            export_path: None,
            retry: RetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_secs: u64,
    pub backoff_factor: f64,
    pub max_delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            base_delay_secs: defaults.base_delay.as_secs(),
            backoff_factor: defaults.backoff_factor,
            max_delay_secs: defaults.max_delay.as_secs(),
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs(self.base_delay_secs),
            backoff_factor: self.backoff_factor,
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

impl RolesyncConfig {
    /// Load the config file, falling back to defaults when it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_file()?)
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Save to a specific path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Could not serialize config")?;
        fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))?;
        Ok(())
    }

    /// Install exclusions from the config plus any given on the command line
    pub fn install_exclusions(&self, extra: Option<&str>) -> ExclusionSet {
        merge_exclusions(&self.install_exclude, extra)
    }

    /// Removal exclusions from the config plus any given on the command line
    pub fn remove_exclusions(&self, extra: Option<&str>) -> ExclusionSet {
        merge_exclusions(&self.remove_exclude, extra)
    }

    /// Targets from the command line, or from the config when none are given
    pub fn resolve_targets(&self, cli: &[String]) -> Vec<Host> {
        let names = if cli.is_empty() { &self.targets } else { cli };
        names
            .iter()
            .flat_map(|n| n.split(','))
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(Host::new)
            .collect()
    }

    /// Export path from the command line, or from the config
    pub fn resolve_export(&self, cli: Option<&Path>) -> Option<PathBuf> {
        cli.map(Path::to_path_buf)
            .or_else(|| self.export_path.as_deref().map(paths::expand))
    }

    /// Throttle from the command line, or from the config
    pub fn resolve_throttle(&self, cli: Option<usize>) -> usize {
        cli.unwrap_or(self.throttle).max(1)
    }
}

fn merge_exclusions(configured: &[String], extra: Option<&str>) -> ExclusionSet {
    let mut set: ExclusionSet = configured.iter().map(String::as_str).collect();
    if let Some(list) = extra {
        set.extend_from(&ExclusionSet::parse_list(list));
    }
    set
}

// ============================================================================
// Tests
// ============================================================================
