//! Action records and the per-host action log.

use featurekit::Host;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the engine did (or would do, when simulating) to a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Feature was installed
    Installed,
    /// Feature was removed
    Removed,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Installed => f.write_str("Installed"),
            Action::Removed => f.write_str("Removed"),
        }
    }
}

/// One decision of the engine for one feature on one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Host the action applies to
    pub host: Host,
    /// Feature name
    pub feature: String,
    /// Install or removal
    pub action: Action,
}

impl ActionRecord {
    /// Create a record.
    pub fn new(host: Host, feature: impl Into<String>, action: Action) -> Self {
        Self {
            host,
            feature: feature.into(),
            action,
        }
    }
}

/// Append-only, ordered log of the actions taken on one host.
///
/// No deduplication: a feature may appear once per phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ActionLog {
    records: Vec<ActionRecord>,
}

impl ActionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: ActionRecord) {
        self.records.push(record);
    }

    /// Records in the order they were appended.
    pub fn records(&self) -> &[ActionRecord] {
        &self.records
    }

    /// Iterate over records.
    pub fn iter(&self) -> std::slice::Iter<'_, ActionRecord> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of install records.
    pub fn installs(&self) -> usize {
        self.count(Action::Installed)
    }

    /// Number of removal records.
    pub fn removals(&self) -> usize {
        self.count(Action::Removed)
    }

    /// Consume the log, returning its records.
    pub fn into_records(self) -> Vec<ActionRecord> {
        self.records
    }

    fn count(&self, action: Action) -> usize {
        self.records.iter().filter(|r| r.action == action).count()
    }
}

impl<'a> IntoIterator for &'a ActionLog {
    type Item = &'a ActionRecord;
    type IntoIter = std::slice::Iter<'a, ActionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
