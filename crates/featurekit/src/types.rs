//! Core types for role/feature catalogs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;

/// A host in the fleet, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Host(String);

impl Host {
    /// Create a host from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The machine this process runs on.
    pub fn local() -> Self {
        Self::new("localhost")
    }

    /// Host name as given.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether this name refers to the local machine.
    ///
    /// Local hosts are queried and changed without a remoting hop.
    pub fn is_local(&self) -> bool {
        let name = self.0.trim();
        if name.is_empty() || name == "." || name.eq_ignore_ascii_case("localhost") {
            return true;
        }
        std::env::var("COMPUTERNAME")
            .map(|own| own.eq_ignore_ascii_case(name))
            .unwrap_or(false)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Host {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Host {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Installation state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstallState {
    /// Present on the host
    Installed,
    /// Not installed, payload available
    Available,
    /// Not installed, payload removed from the host
    Removed,
    /// Install scheduled, waiting for a reboot
    InstallPending,
    /// Removal scheduled, waiting for a reboot
    UninstallPending,
    /// State the platform could not report or that we do not model
    #[serde(other)]
    Unknown,
}

impl InstallState {
    /// Parse a platform state string, mapping unrecognized values to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "installed" => Self::Installed,
            "available" => Self::Available,
            "removed" => Self::Removed,
            "installpending" => Self::InstallPending,
            "uninstallpending" => Self::UninstallPending,
            _ => Self::Unknown,
        }
    }
}

/// Kind of catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureType {
    /// Server role
    Role,
    /// Service belonging to a role
    RoleService,
    /// Stand-alone feature
    Feature,
}

impl FeatureType {
    /// Parse a platform type string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "role" => Some(Self::Role),
            "role service" | "roleservice" => Some(Self::RoleService),
            "feature" => Some(Self::Feature),
            _ => None,
        }
    }

    /// Label used in listings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::RoleService => "role service",
            Self::Feature => "feature",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry in a host's role/feature catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Unique key within a snapshot (e.g. "Web-Server")
    pub name: String,
    /// Human-readable name
    pub display_name: String,
    /// Whether the feature is installed
    pub installed: bool,
    /// Detailed installation state
    pub install_state: InstallState,
    /// Role, role service or feature
    pub feature_type: FeatureType,
    /// Hierarchical location (e.g. "Web Server (IIS)\Web Server")
    #[serde(default)]
    pub path: String,
    /// Nesting level in the catalog tree
    #[serde(default)]
    pub depth: u32,
    /// Names this feature depends on
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Parent feature name
    #[serde(default)]
    pub parent: Option<String>,
    /// Names of sub-features
    #[serde(default)]
    pub sub_features: Vec<String>,
    /// Opaque platform metadata
    #[serde(default)]
    pub additional_info: BTreeMap<String, String>,
}

impl FeatureRecord {
    /// Create a top-level feature record.
    pub fn new(name: impl Into<String>, feature_type: FeatureType, installed: bool) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            path: name.clone(),
            name,
            installed,
            install_state: if installed {
                InstallState::Installed
            } else {
                InstallState::Available
            },
            feature_type,
            depth: 1,
            depends_on: Vec::new(),
            parent: None,
            sub_features: Vec::new(),
            additional_info: BTreeMap::new(),
        }
    }

    /// Set the parent feature.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        let parent = parent.into();
        self.path = format!("{}\\{}", parent, self.name);
        self.depth += 1;
        self.parent = Some(parent);
        self
    }

    /// Add a dependency.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }
}

/// Point-in-time catalog of one host.
///
/// Produced by a single inventory query and never patched; a newer view
/// of the host is a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    /// Host the catalog was read from
    pub host: Host,
    /// When the catalog was read
    pub captured_at: DateTime<Utc>,
    /// Catalog entries in platform order
    pub features: Vec<FeatureRecord>,
}

impl FeatureSnapshot {
    /// Create a snapshot captured now.
    pub fn new(host: Host, features: Vec<FeatureRecord>) -> Self {
        Self {
            host,
            captured_at: Utc::now(),
            features,
        }
    }

    /// Names of installed features, in catalog order.
    pub fn installed(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| f.installed)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Names of features that are not installed, in catalog order.
    pub fn not_installed(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| !f.installed)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Installed names as a set, for membership tests.
    pub fn installed_names(&self) -> HashSet<&str> {
        self.installed().into_iter().collect()
    }

    /// Number of catalog entries.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Count installed entries by type.
    pub fn summary(&self) -> SnapshotSummary {
        let mut summary = SnapshotSummary {
            total: self.features.len(),
            ..Default::default()
        };
        for feature in self.features.iter().filter(|f| f.installed) {
            summary.installed += 1;
            match feature.feature_type {
                FeatureType::Role => summary.roles += 1,
                FeatureType::RoleService => summary.role_services += 1,
                FeatureType::Feature => summary.features += 1,
            }
        }
        summary
    }
}

/// Installed counts for a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    /// Catalog entries
    pub total: usize,
    /// Installed entries
    pub installed: usize,
    /// Installed roles
    pub roles: usize,
    /// Installed role services
    pub role_services: usize,
    /// Installed features
    pub features: usize,
}

/// Configuration for retrying transient remoting failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            max_delay: Duration::from_secs(60),
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureSnapshot {
        FeatureSnapshot::new(
            Host::new("srv01"),
            vec![
                FeatureRecord::new("Web-Server", FeatureType::Role, true),
                FeatureRecord::new("Web-Ftp-Server", FeatureType::RoleService, false)
                    .with_parent("Web-Server"),
                FeatureRecord::new("Telnet-Client", FeatureType::Feature, false),
                FeatureRecord::new("NET-Framework-45-Core", FeatureType::Feature, true),
            ],
        )
    }

    #[test]
    fn test_installed_preserves_catalog_order() {
        let snapshot = sample();
        assert_eq!(snapshot.installed(), vec!["Web-Server", "NET-Framework-45-Core"]);
        assert_eq!(snapshot.not_installed(), vec!["Web-Ftp-Server", "Telnet-Client"]);
    }

    #[test]
    fn test_installed_and_not_installed_partition_catalog() {
        let snapshot = sample();
        let installed = snapshot.installed_names();
        assert_eq!(installed.len() + snapshot.not_installed().len(), snapshot.len());
        assert!(snapshot.not_installed().iter().all(|n| !installed.contains(n)));
    }

    #[test]
    fn test_summary_counts_by_type() {
        let summary = sample().summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.installed, 2);
        assert_eq!(summary.roles, 1);
        assert_eq!(summary.features, 1);
        assert_eq!(summary.role_services, 0);
    }

    #[test]
    fn test_with_parent_extends_path() {
        let record = FeatureRecord::new("Web-Ftp-Server", FeatureType::RoleService, false)
            .with_parent("Web-Server");
        assert_eq!(record.parent.as_deref(), Some("Web-Server"));
        assert_eq!(record.path, "Web-Server\\Web-Ftp-Server");
        assert_eq!(record.depth, 2);
    }

    #[test]
    fn test_install_state_parse() {
        assert_eq!(InstallState::parse("Installed"), InstallState::Installed);
        assert_eq!(InstallState::parse("installpending"), InstallState::InstallPending);
        assert_eq!(InstallState::parse("SomethingNew"), InstallState::Unknown);
    }

    #[test]
    fn test_install_state_unknown_deserializes() {
        let state: InstallState = serde_json::from_str("\"Staged\"").unwrap();
        assert_eq!(state, InstallState::Unknown);
    }

    #[test]
    fn test_feature_type_parse() {
        assert_eq!(FeatureType::parse("Role Service"), Some(FeatureType::RoleService));
        assert_eq!(FeatureType::parse("Feature"), Some(FeatureType::Feature));
        assert_eq!(FeatureType::parse("Driver"), None);
    }

    #[test]
    fn test_host_is_local() {
        assert!(Host::local().is_local());
        assert!(Host::new(".").is_local());
        assert!(Host::new("LOCALHOST").is_local());
    }

    #[test]
    fn test_retry_config_delay() {
        let config = RetryConfig::new(5, Duration::from_secs(5), 2.0);

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(5));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(10));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(20));
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(60));
    }
}
