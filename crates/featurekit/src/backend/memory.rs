//! In-process fleet backend.
//!
//! Holds a catalog per host and applies installs and removals to it,
//! including configurable cascades (acting on one feature silently acts on
//! others too). Every call is counted so callers can observe how often a
//! host was queried or changed. Failures can be injected per host.

use crate::backend::HostBackend;
use crate::error::{Error, Result};
use crate::types::{FeatureRecord, FeatureSnapshot, Host, InstallState};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryHost {
    catalog: Vec<FeatureRecord>,
    unreachable: bool,
    fail_install: HashSet<String>,
    fail_remove: HashSet<String>,
    fail_audit: bool,
    queries: usize,
    installs: Vec<String>,
    removals: Vec<String>,
    audits: Vec<Vec<String>>,
}

impl MemoryHost {
    fn set_installed(&mut self, name: &str, installed: bool) -> bool {
        match self.catalog.iter_mut().find(|f| f.name == name) {
            Some(record) => {
                record.installed = installed;
                record.install_state = if installed {
                    InstallState::Installed
                } else {
                    InstallState::Available
                };
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    hosts: HashMap<Host, MemoryHost>,
    install_cascades: HashMap<String, Vec<String>>,
    remove_cascades: HashMap<String, Vec<String>>,
}

/// Backend that keeps a simulated fleet in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    /// Create an empty fleet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host with the given catalog.
    pub fn with_host(self, host: impl Into<Host>, catalog: Vec<FeatureRecord>) -> Self {
        self.add_host(host, catalog);
        self
    }

    /// Installing `trigger` also installs every feature in `also`.
    pub fn with_install_cascade(self, trigger: &str, also: &[&str]) -> Self {
        self.lock()
            .install_cascades
            .entry(trigger.to_string())
            .or_default()
            .extend(also.iter().map(|s| s.to_string()));
        self
    }

    /// Removing `trigger` also removes every feature in `also`.
    pub fn with_remove_cascade(self, trigger: &str, also: &[&str]) -> Self {
        self.lock()
            .remove_cascades
            .entry(trigger.to_string())
            .or_default()
            .extend(also.iter().map(|s| s.to_string()));
        self
    }

    /// Add or replace a host.
    pub fn add_host(&self, host: impl Into<Host>, catalog: Vec<FeatureRecord>) {
        self.lock().hosts.insert(
            host.into(),
            MemoryHost {
                catalog,
                ..Default::default()
            },
        );
    }

    /// Make every call against `host` fail as unreachable.
    pub fn set_unreachable(&self, host: &Host) {
        self.with_host_mut(host, |h| h.unreachable = true);
    }

    /// Make installing `name` on `host` fail.
    pub fn fail_install(&self, host: &Host, name: &str) {
        self.with_host_mut(host, |h| {
            h.fail_install.insert(name.to_string());
        });
    }

    /// Make removing `name` from `host` fail.
    pub fn fail_remove(&self, host: &Host, name: &str) {
        self.with_host_mut(host, |h| {
            h.fail_remove.insert(name.to_string());
        });
    }

    /// Make audit writes on `host` fail.
    pub fn fail_audit(&self, host: &Host) {
        self.with_host_mut(host, |h| h.fail_audit = true);
    }

    /// Installed names on `host`, in catalog order.
    pub fn installed(&self, host: &Host) -> Vec<String> {
        self.lock()
            .hosts
            .get(host)
            .map(|h| {
                h.catalog
                    .iter()
                    .filter(|f| f.installed)
                    .map(|f| f.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of inventory queries served for `host`.
    pub fn query_count(&self, host: &Host) -> usize {
        self.lock().hosts.get(host).map_or(0, |h| h.queries)
    }

    /// Features explicitly installed on `host`, in call order.
    pub fn install_calls(&self, host: &Host) -> Vec<String> {
        self.lock()
            .hosts
            .get(host)
            .map(|h| h.installs.clone())
            .unwrap_or_default()
    }

    /// Features explicitly removed from `host`, in call order.
    pub fn remove_calls(&self, host: &Host) -> Vec<String> {
        self.lock()
            .hosts
            .get(host)
            .map(|h| h.removals.clone())
            .unwrap_or_default()
    }

    /// Audit snapshots written for `host`.
    pub fn audits(&self, host: &Host) -> Vec<Vec<String>> {
        self.lock()
            .hosts
            .get(host)
            .map(|h| h.audits.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn with_host_mut(&self, host: &Host, f: impl FnOnce(&mut MemoryHost)) {
        let mut state = self.lock();
        let entry = state.hosts.entry(host.clone()).or_default();
        f(entry);
    }

    fn reachable<'a>(state: &'a mut State, host: &Host) -> Result<&'a mut MemoryHost> {
        match state.hosts.get_mut(host) {
            Some(h) if !h.unreachable => Ok(h),
            Some(_) => Err(Error::UnreachableHost {
                host: host.to_string(),
                message: "host marked unreachable".to_string(),
            }),
            None => Err(Error::UnreachableHost {
                host: host.to_string(),
                message: "no such host".to_string(),
            }),
        }
    }

    /// Apply a change and its cascades to one host.
    fn change(&self, host: &Host, name: &str, install: bool) -> Result<()> {
        let mut state = self.lock();
        let cascade = if install {
            state.install_cascades.get(name).cloned().unwrap_or_default()
        } else {
            state.remove_cascades.get(name).cloned().unwrap_or_default()
        };
        let target = Self::reachable(&mut state, host)?;

        let injected = if install {
            target.fail_install.contains(name)
        } else {
            target.fail_remove.contains(name)
        };
        let failure = |cause: &str| {
            if install {
                Error::InstallFailed {
                    host: host.to_string(),
                    name: name.to_string(),
                    cause: cause.to_string(),
                }
            } else {
                Error::RemoveFailed {
                    host: host.to_string(),
                    name: name.to_string(),
                    cause: cause.to_string(),
                }
            }
        };

        if injected {
            return Err(failure("injected failure"));
        }
        if !target.set_installed(name, install) {
            return Err(failure("feature not in catalog"));
        }
        for other in &cascade {
            target.set_installed(other, install);
        }

        if install {
            target.installs.push(name.to_string());
        } else {
            target.removals.push(name.to_string());
        }
        Ok(())
    }
}

impl HostBackend for MemoryBackend {
    fn query_inventory(&self, host: &Host) -> Result<FeatureSnapshot> {
        let mut state = self.lock();
        let target = Self::reachable(&mut state, host)?;
        target.queries += 1;
        Ok(FeatureSnapshot::new(host.clone(), target.catalog.clone()))
    }

    fn install(&self, host: &Host, name: &str) -> Result<()> {
        self.change(host, name, true)
    }

    fn remove(&self, host: &Host, name: &str) -> Result<()> {
        self.change(host, name, false)
    }

    fn persist_audit(&self, host: &Host, installed: &[&str]) -> Result<PathBuf> {
        let mut state = self.lock();
        let target = Self::reachable(&mut state, host)?;
        if target.fail_audit {
            return Err(Error::AuditWriteFailed {
                host: host.to_string(),
                message: "injected failure".to_string(),
            });
        }
        target
            .audits
            .push(installed.iter().map(|s| s.to_string()).collect());
        Ok(PathBuf::from(format!(
            "memory://{}/rolesync-audit-{}.txt",
            host,
            target.audits.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureType;

    fn catalog() -> Vec<FeatureRecord> {
        vec![
            FeatureRecord::new("Web-Server", FeatureType::Role, false),
            FeatureRecord::new("Web-WebServer", FeatureType::RoleService, false)
                .with_parent("Web-Server"),
            FeatureRecord::new("Telnet-Client", FeatureType::Feature, true),
        ]
    }

    #[test]
    fn test_install_applies_cascade() {
        let host = Host::new("srv01");
        let backend = MemoryBackend::new()
            .with_host("srv01", catalog())
            .with_install_cascade("Web-Server", &["Web-WebServer"]);

        backend.install(&host, "Web-Server").unwrap();

        assert_eq!(
            backend.installed(&host),
            vec!["Web-Server", "Web-WebServer", "Telnet-Client"]
        );
        assert_eq!(backend.install_calls(&host), vec!["Web-Server"]);
    }

    #[test]
    fn test_remove_applies_cascade() {
        let host = Host::new("srv01");
        let backend = MemoryBackend::new()
            .with_host("srv01", catalog())
            .with_install_cascade("Web-Server", &["Web-WebServer"])
            .with_remove_cascade("Web-Server", &["Web-WebServer"]);

        backend.install(&host, "Web-Server").unwrap();
        backend.remove(&host, "Web-Server").unwrap();

        assert_eq!(backend.installed(&host), vec!["Telnet-Client"]);
    }

    #[test]
    fn test_query_counts_calls() {
        let host = Host::new("srv01");
        let backend = MemoryBackend::new().with_host("srv01", catalog());

        let snapshot = backend.query_inventory(&host).unwrap();
        backend.query_inventory(&host).unwrap();

        assert_eq!(snapshot.installed(), vec!["Telnet-Client"]);
        assert_eq!(backend.query_count(&host), 2);
    }

    #[test]
    fn test_unknown_host_is_unreachable() {
        let backend = MemoryBackend::new();
        let err = backend.query_inventory(&Host::new("ghost")).unwrap_err();
        assert!(matches!(err, Error::UnreachableHost { .. }));
    }

    #[test]
    fn test_injected_failures() {
        let host = Host::new("srv01");
        let backend = MemoryBackend::new().with_host("srv01", catalog());
        backend.fail_install(&host, "Web-Server");
        backend.fail_audit(&host);

        assert!(matches!(
            backend.install(&host, "Web-Server"),
            Err(Error::InstallFailed { .. })
        ));
        assert!(matches!(
            backend.persist_audit(&host, &["Telnet-Client"]),
            Err(Error::AuditWriteFailed { .. })
        ));
        assert!(backend.install_calls(&host).is_empty());
    }

    #[test]
    fn test_unknown_feature_fails() {
        let host = Host::new("srv01");
        let backend = MemoryBackend::new().with_host("srv01", catalog());
        assert!(matches!(
            backend.remove(&host, "No-Such-Feature"),
            Err(Error::RemoveFailed { .. })
        ));
    }

    #[test]
    fn test_persist_audit_records_names() {
        let host = Host::new("srv01");
        let backend = MemoryBackend::new().with_host("srv01", catalog());

        let path = backend.persist_audit(&host, &["Telnet-Client"]).unwrap();

        assert!(path.to_string_lossy().contains("srv01"));
        assert_eq!(backend.audits(&host), vec![vec!["Telnet-Client".to_string()]]);
    }
}
