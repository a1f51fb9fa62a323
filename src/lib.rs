//! Domwatch: element-presence watching over an in-memory DOM
//!
//! This library scans a document for a set of named selectors, publishes the
//! resulting presence mapping, and keeps it current by rescanning on mutation
//! batches until every element is present.

pub mod error;
pub mod config;

pub mod dom;
pub mod watcher;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};

pub use dom::{
    DomDocument, DomTree, ElementSpec, MutationBatch, MutationFeed, MutationRecord, NodeId,
    ObserveOptions, Selector,
};
pub use watcher::{
    presence_stream, scan_once, wait_settled, ElementWatcher, PresenceMap, TrackedSet,
    WatchSession, WatchState,
};

/// Domwatch library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
