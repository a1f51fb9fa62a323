//! Document abstraction
//!
//! The watcher layer talks to documents through [`DomDocument`], so the
//! concrete tree in `dom::tree` can be swapped for another backend in tests
//! without touching session logic.

use crate::dom::observer::MutationFeed;
use crate::dom::selector::Selector;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node inside a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Identifier of a registered mutation observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Scope of a mutation observation, forwarded verbatim to [`DomDocument::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserveOptions {
    /// Deliver child-list mutations of the observed node
    pub child_list: bool,
    /// Extend observation to all descendants of the observed node
    pub subtree: bool,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            child_list: true,
            subtree: true,
        }
    }
}

/// A single child-list change at one target node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationRecord {
    /// Node whose child list changed
    pub target: NodeId,
    /// Roots of subtrees that were attached
    pub added: Vec<NodeId>,
    /// Roots of subtrees that were detached
    pub removed: Vec<NodeId>,
}

impl MutationRecord {
    /// True if this record attached at least one node
    pub fn has_additions(&self) -> bool {
        !self.added.is_empty()
    }
}

/// A group of records delivered to a feed in one go
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationBatch {
    pub records: Vec<MutationRecord>,
}

impl MutationBatch {
    /// True if any record in the batch attached nodes
    pub fn has_additions(&self) -> bool {
        self.records.iter().any(MutationRecord::has_additions)
    }
}

/// Read and observe access to a document
pub trait DomDocument: fmt::Debug + Send + Sync {
    /// First node matching a compiled selector, in document order
    fn query(&self, selector: &Selector) -> Option<NodeId>;

    /// First node matching a selector string, in document order
    ///
    /// Fails with [`crate::Error::MalformedSelector`] if the string does not
    /// compile; an absent element is `Ok(None)`.
    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>>;

    /// The `<body>` node, the default observation root
    fn body(&self) -> NodeId;

    /// Whether the node is currently connected to the document root
    fn contains(&self, node: NodeId) -> bool;

    /// Register a mutation feed over the subtree rooted at `root`
    fn observe(&self, root: NodeId, options: ObserveOptions) -> Result<MutationFeed>;
}
