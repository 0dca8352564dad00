//! # featurekit
//!
//! Typed access to the role/feature catalogs of Windows Server hosts.
//!
//! This crate provides:
//! - The catalog model ([`FeatureRecord`], [`FeatureSnapshot`])
//! - The [`HostBackend`] trait for querying and changing hosts
//! - A PowerShell remoting backend and an in-memory fleet backend
//! - Manifest files for reusing a snapshot as a reference
//! - Retry with exponential backoff for unreachable hosts
//!
//! ## Example
//!
//! ```no_run
//! use featurekit::{Host, HostBackend, PowerShellBackend};
//! use std::path::Path;
//!
//! let backend = PowerShellBackend::new();
//! let snapshot = backend.query_inventory(&Host::new("srv01"))?;
//! for name in snapshot.installed() {
//!     println!("{name}");
//! }
//!
//! featurekit::save_manifest(&snapshot, Path::new("srv01.json"))?;
//! # Ok::<(), featurekit::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod manifest;
pub mod retry;
pub mod types;

pub use backend::HostBackend;
pub use backend::memory::MemoryBackend;
pub use backend::powershell::PowerShellBackend;
pub use error::{Error, ErrorCategory, Operation, Result};
pub use manifest::{load_manifest, save_manifest};
pub use types::{
    FeatureRecord, FeatureSnapshot, FeatureType, Host, InstallState, RetryConfig, SnapshotSummary,
};
