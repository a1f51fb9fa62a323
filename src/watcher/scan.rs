//! Selector compilation and presence scans

use crate::dom::{DomDocument, Selector};
use crate::error::Result;
use crate::watcher::presence::{PresenceMap, TrackedSet};
use std::collections::BTreeMap;
use tracing::debug;

/// A tracked set with every selector compiled up front
///
/// Compilation is the only fallible step; scans over a compiled set cannot
/// fail, so sessions surface [`crate::Error::MalformedSelector`] before any
/// observer is attached.
#[derive(Debug, Clone)]
pub(crate) struct CompiledSet {
    entries: Vec<(String, Selector)>,
}

impl CompiledSet {
    pub(crate) fn compile(tracked: &TrackedSet) -> Result<Self> {
        let mut entries = Vec::with_capacity(tracked.len());
        for (name, selector) in tracked.iter() {
            entries.push((name.to_string(), Selector::parse(selector)?));
        }
        Ok(Self { entries })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// One full pass over the document: every tracked selector is re-queried,
/// whether or not it was present last time
pub(crate) fn scan(doc: &dyn DomDocument, compiled: &CompiledSet) -> PresenceMap {
    let mut entries = BTreeMap::new();
    for (name, selector) in &compiled.entries {
        let present = doc.query(selector).is_some();
        entries.insert(name.clone(), present);
    }
    let map = PresenceMap::from_entries(entries);
    debug!(
        "scan complete: {} tracked, {} missing",
        compiled.len(),
        map.missing().count()
    );
    map
}

/// One-shot presence check without attaching an observer
pub fn scan_once(doc: &dyn DomDocument, tracked: &TrackedSet) -> Result<PresenceMap> {
    let compiled = CompiledSet::compile(tracked)?;
    Ok(scan(doc, &compiled))
}
