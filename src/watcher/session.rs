//! Watch sessions
//!
//! A [`WatchSession`] is one observation of one tracked set: scan first,
//! publish, and only then attach an observer if anything is missing. The
//! rescan worker runs until every element is present or the session is
//! detached, whichever comes first.

use crate::dom::{DomDocument, MutationFeed, NodeId, ObserveOptions, ObserverHandle};
use crate::error::Result;
use crate::watcher::presence::{PresenceMap, TrackedSet};
use crate::watcher::scan::{scan, CompiledSet};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Lifecycle state of a session or watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// No observer attached; either settled or never needed one
    Idle,
    /// Observer attached, rescanning on mutation batches
    Watching,
}

/// State shared between the session handle and its rescan worker
struct SessionShared {
    publisher: watch::Sender<PresenceMap>,
    watching: AtomicBool,
}

impl SessionShared {
    fn state(&self) -> WatchState {
        if self.watching.load(Ordering::SeqCst) {
            WatchState::Watching
        } else {
            WatchState::Idle
        }
    }

    fn set_watching(&self, watching: bool) {
        self.watching.store(watching, Ordering::SeqCst);
    }

    /// Publish `next` only if it differs from the current mapping
    fn publish_if_changed(&self, next: PresenceMap) -> bool {
        self.publisher.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }
}

/// One observation of one tracked set over one document
pub struct WatchSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    root: NodeId,
    options: ObserveOptions,
    shared: Arc<SessionShared>,
    observer: Option<ObserverHandle>,
    worker: Option<JoinHandle<()>>,
}

impl WatchSession {
    /// Scan immediately, publish the result, and attach an observer only if
    /// at least one tracked element is missing
    ///
    /// Fails if any selector does not compile; nothing is attached in that
    /// case. Must be called from within a Tokio runtime, which the rescan
    /// worker is spawned onto.
    pub fn start(
        doc: Arc<dyn DomDocument>,
        tracked: &TrackedSet,
        options: ObserveOptions,
        root: NodeId,
    ) -> Result<WatchSession> {
        let compiled = CompiledSet::compile(tracked)?;
        let initial = scan(doc.as_ref(), &compiled);
        let id = Uuid::new_v4();

        let (publisher, _) = watch::channel(initial.clone());
        let shared = Arc::new(SessionShared {
            publisher,
            watching: AtomicBool::new(false),
        });
        let mut session = WatchSession {
            id,
            started_at: Utc::now(),
            root,
            options,
            shared: Arc::clone(&shared),
            observer: None,
            worker: None,
        };

        if compiled.is_empty() || initial.all_present() {
            debug!("session {}: nothing missing, staying idle", id);
            return Ok(session);
        }

        let feed = doc.observe(root, options)?;
        session.observer = Some(feed.handle());
        shared.set_watching(true);
        info!(
            "session {}: watching {} for {} missing element(s)",
            id,
            root,
            initial.missing().count()
        );
        session.worker = Some(tokio::spawn(run_worker(doc, compiled, feed, shared, id)));

        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The observed node
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn options(&self) -> ObserveOptions {
        self.options
    }

    pub fn state(&self) -> WatchState {
        self.shared.state()
    }

    pub fn is_watching(&self) -> bool {
        self.state() == WatchState::Watching
    }

    /// A receiver over the published presence mappings
    pub fn subscribe(&self) -> watch::Receiver<PresenceMap> {
        self.shared.publisher.subscribe()
    }

    /// The most recently published mapping
    pub fn current(&self) -> PresenceMap {
        self.shared.publisher.borrow().clone()
    }

    /// Disconnect the observer and stop the rescan worker; idempotent
    ///
    /// The observer registration is removed synchronously, so mutations
    /// after this call cannot produce further publications. The last
    /// published mapping stays readable on existing receivers.
    pub fn detach(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
            debug!("session {}: observer disconnected on detach", self.id);
        }
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        self.shared.set_watching(false);
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSession")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("state", &self.state())
            .finish()
    }
}

/// Rescan loop: every batch that attached nodes triggers one full scan
async fn run_worker(
    doc: Arc<dyn DomDocument>,
    compiled: CompiledSet,
    mut feed: MutationFeed,
    shared: Arc<SessionShared>,
    session: Uuid,
) {
    debug!("session {}: worker started on feed {}", session, feed.id());
    while let Some(batch) = feed.recv().await {
        // Removal-only batches cannot flip an absent selector to present
        if !batch.has_additions() {
            continue;
        }
        let next = scan(doc.as_ref(), &compiled);
        let settled = next.all_present();
        if shared.publish_if_changed(next) {
            debug!("session {}: presence mapping changed", session);
        }
        if settled {
            feed.disconnect();
            shared.set_watching(false);
            info!(
                "session {}: all tracked elements present, observer disconnected",
                session
            );
            break;
        }
    }
    debug!("session {}: worker exited", session);
}
