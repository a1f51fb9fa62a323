//! Tracked sets and presence mappings

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Selectors to track, keyed by a caller-chosen name
///
/// Names are unique; inserting a name twice keeps the later selector. The
/// map is ordered so content-identical sets serialize identically no matter
/// how they were built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackedSet {
    elements: BTreeMap<String, String>,
}

impl TrackedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, selector: impl Into<String>) -> Self {
        self.elements.insert(name.into(), selector.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, selector: impl Into<String>) {
        self.elements.insert(name.into(), selector.into());
    }

    /// Selector registered under `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.elements.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// `(name, selector)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.elements
            .iter()
            .map(|(name, selector)| (name.as_str(), selector.as_str()))
    }
}

impl<N: Into<String>, S: Into<String>> FromIterator<(N, S)> for TrackedSet {
    fn from_iter<I: IntoIterator<Item = (N, S)>>(iter: I) -> Self {
        let mut set = TrackedSet::new();
        for (name, selector) in iter {
            set.insert(name, selector);
        }
        set
    }
}

/// Presence of every tracked element as of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PresenceMap {
    entries: BTreeMap<String, bool>,
}

impl PresenceMap {
    pub(crate) fn from_entries(entries: BTreeMap<String, bool>) -> Self {
        Self { entries }
    }

    /// Whether `name` was present; unknown names count as absent
    pub fn is_present(&self, name: &str) -> bool {
        self.entries.get(name).copied().unwrap_or(false)
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.entries.get(name).copied()
    }

    /// True once every entry is present; vacuously true when empty
    pub fn all_present(&self) -> bool {
        self.entries.values().all(|&present| present)
    }

    /// Names still absent, in name order
    pub fn missing(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, &present)| !present)
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(name, present)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries
            .iter()
            .map(|(name, &present)| (name.as_str(), present))
    }
}
