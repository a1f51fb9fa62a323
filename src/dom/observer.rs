//! Mutation feeds
//!
//! A [`MutationFeed`] is the receiving end of one observer registration on a
//! [`DomTree`](crate::dom::DomTree). The tree pushes batches into an
//! unbounded channel; the feed owns a handle to the shared registry so it can
//! remove its own entry synchronously on disconnect or drop.

use crate::dom::traits::{MutationBatch, NodeId, ObserveOptions, ObserverId};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Shared observer table, owned by the tree and by every feed on it
pub(crate) type ObserverRegistry = Arc<Mutex<Vec<ObserverEntry>>>;

/// One registered observer as seen by the dispatching tree
#[derive(Debug)]
pub(crate) struct ObserverEntry {
    pub(crate) id: ObserverId,
    pub(crate) root: NodeId,
    pub(crate) options: ObserveOptions,
    pub(crate) sender: mpsc::UnboundedSender<MutationBatch>,
}

/// Receiving end of one observer registration
#[derive(Debug)]
pub struct MutationFeed {
    id: ObserverId,
    root: NodeId,
    options: ObserveOptions,
    receiver: mpsc::UnboundedReceiver<MutationBatch>,
    registry: ObserverRegistry,
    disconnected: bool,
}

impl MutationFeed {
    pub(crate) fn new(
        id: ObserverId,
        root: NodeId,
        options: ObserveOptions,
        receiver: mpsc::UnboundedReceiver<MutationBatch>,
        registry: ObserverRegistry,
    ) -> Self {
        Self {
            id,
            root,
            options,
            receiver,
            registry,
            disconnected: false,
        }
    }

    /// Wait for the next batch; `None` once the feed is disconnected and drained
    pub async fn recv(&mut self) -> Option<MutationBatch> {
        self.receiver.recv().await
    }

    /// Non-blocking receive; `None` if nothing is queued
    pub fn try_recv(&mut self) -> Option<MutationBatch> {
        self.receiver.try_recv().ok()
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// The node this feed observes
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn options(&self) -> ObserveOptions {
        self.options
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// A detached handle that can disconnect this feed from another place
    pub fn handle(&self) -> ObserverHandle {
        ObserverHandle {
            id: self.id,
            registry: self.registry.clone(),
        }
    }

    /// Remove this feed's registry entry; queued batches stay readable
    ///
    /// Idempotent. After removal the tree delivers nothing further.
    pub fn disconnect(&mut self) {
        if self.disconnected {
            return;
        }
        self.disconnected = true;
        remove_entry(&self.registry, self.id);
        debug!("mutation feed {} disconnected", self.id);
    }
}

impl Drop for MutationFeed {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Disconnect handle detached from the feed's receiving half
#[derive(Debug, Clone)]
pub struct ObserverHandle {
    id: ObserverId,
    registry: ObserverRegistry,
}

impl ObserverHandle {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Whether the registration is still in the tree's observer table
    pub fn is_connected(&self) -> bool {
        match self.registry.lock() {
            Ok(entries) => entries.iter().any(|entry| entry.id == self.id),
            Err(e) => {
                warn!("observer registry lock error: {}", e);
                false
            }
        }
    }

    /// Remove the registration; idempotent
    pub fn disconnect(&self) {
        remove_entry(&self.registry, self.id);
    }
}

fn remove_entry(registry: &ObserverRegistry, id: ObserverId) {
    match registry.lock() {
        Ok(mut entries) => entries.retain(|entry| entry.id != id),
        Err(e) => warn!("observer registry lock error: {}", e),
    }
}
