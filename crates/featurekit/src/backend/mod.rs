//! Host backends for inventory queries and feature changes.
//!
//! The [`HostBackend`] trait is the only way the reconciliation engine
//! reaches a host, which keeps the decision logic independent of the
//! remoting transport:
//! - [`powershell::PowerShellBackend`] drives real hosts through PowerShell remoting
//! - [`memory::MemoryBackend`] simulates a fleet in-process

pub mod memory;
pub mod powershell;

use crate::error::Result;
use crate::types::{FeatureSnapshot, Host};
use std::path::PathBuf;

/// Backend trait for role/feature operations on a host.
///
/// Implementations must be shareable across the worker threads that
/// reconcile different hosts concurrently.
pub trait HostBackend: Send + Sync {
    /// Read the full feature catalog of a host.
    fn query_inventory(&self, host: &Host) -> Result<FeatureSnapshot>;

    /// Install a feature on a host.
    fn install(&self, host: &Host, name: &str) -> Result<()>;

    /// Remove a feature from a host.
    fn remove(&self, host: &Host, name: &str) -> Result<()>;

    /// Write the given installed names to a host-local audit file.
    ///
    /// Returns the path of the file on the host.
    fn persist_audit(&self, host: &Host, installed: &[&str]) -> Result<PathBuf>;
}

impl<B: HostBackend + ?Sized> HostBackend for &B {
    fn query_inventory(&self, host: &Host) -> Result<FeatureSnapshot> {
        (**self).query_inventory(host)
    }

    fn install(&self, host: &Host, name: &str) -> Result<()> {
        (**self).install(host, name)
    }

    fn remove(&self, host: &Host, name: &str) -> Result<()> {
        (**self).remove(host, name)
    }

    fn persist_audit(&self, host: &Host, installed: &[&str]) -> Result<PathBuf> {
        (**self).persist_audit(host, installed)
    }
}

impl<B: HostBackend + ?Sized> HostBackend for Box<B> {
    fn query_inventory(&self, host: &Host) -> Result<FeatureSnapshot> {
        (**self).query_inventory(host)
    }

    fn install(&self, host: &Host, name: &str) -> Result<()> {
        (**self).install(host, name)
    }

    fn remove(&self, host: &Host, name: &str) -> Result<()> {
        (**self).remove(host, name)
    }

    fn persist_audit(&self, host: &Host, installed: &[&str]) -> Result<PathBuf> {
        (**self).persist_audit(host, installed)
    }
}
