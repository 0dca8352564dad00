//! Exclusion sets for the install and removal phases.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Feature names a phase must leave alone.
///
/// Matching is exact and case-sensitive, the same way catalog names are
/// keyed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionSet(BTreeSet<String>);

impl ExclusionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list such as `"Web-Server, Telnet-Client"`.
    pub fn parse_list(list: &str) -> Self {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Add every name from another set.
    pub fn extend_from(&mut self, other: &ExclusionSet) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Whether the set names `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Number of names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Whether `name` is excluded by `set`.
pub fn is_excluded(name: &str, set: &ExclusionSet) -> bool {
    set.contains(name)
}
