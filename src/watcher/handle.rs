//! The element watcher
//!
//! [`ElementWatcher`] owns at most one live [`WatchSession`] and keys it by
//! configuration content: asking to watch a content-identical configuration
//! reuses the active session, while any difference in tracked set, options
//! or root tears the old session down before starting a fresh one.

use crate::config::Config;
use crate::dom::{DomDocument, NodeId, ObserveOptions};
use crate::error::{Error, Result};
use crate::watcher::presence::{PresenceMap, TrackedSet};
use crate::watcher::session::{WatchSession, WatchState};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Content identity of one watch configuration
#[derive(Serialize)]
struct ConfigKey<'a> {
    elements: &'a TrackedSet,
    options: &'a ObserveOptions,
    root: NodeId,
}

/// Canonical serialization of a configuration; equal strings mean equal
/// configurations regardless of how the values were constructed
fn fingerprint(tracked: &TrackedSet, options: &ObserveOptions, root: NodeId) -> Result<String> {
    let key = ConfigKey {
        elements: tracked,
        options,
        root,
    };
    Ok(serde_json::to_string(&key)?)
}

struct ActiveSession {
    fingerprint: String,
    session: WatchSession,
}

/// Watches one document for a set of named selectors
#[derive(Debug)]
pub struct ElementWatcher {
    doc: Arc<dyn DomDocument>,
    defaults: ObserveOptions,
    active: Mutex<Option<ActiveSession>>,
}

impl ElementWatcher {
    pub fn new(doc: Arc<dyn DomDocument>) -> Self {
        Self {
            doc,
            defaults: ObserveOptions::default(),
            active: Mutex::new(None),
        }
    }

    /// A watcher whose default observe options come from `config`
    pub fn with_config(doc: Arc<dyn DomDocument>, config: &Config) -> Self {
        Self {
            doc,
            defaults: config.observe_options(),
            active: Mutex::new(None),
        }
    }

    /// Watch `tracked` under the default options, rooted at the body
    pub fn watch(&self, tracked: &TrackedSet) -> Result<watch::Receiver<PresenceMap>> {
        self.watch_with(tracked, None, None)
    }

    /// Watch with explicit options and/or root
    ///
    /// The initial scan runs before this returns, so the receiver already
    /// holds a mapping. Content-identical reconfiguration reuses the active
    /// session; any difference detaches it and starts over. Fails with
    /// [`Error::MalformedSelector`] if a selector does not compile, in which
    /// case no session replaces the torn-down one.
    pub fn watch_with(
        &self,
        tracked: &TrackedSet,
        options: Option<ObserveOptions>,
        root: Option<NodeId>,
    ) -> Result<watch::Receiver<PresenceMap>> {
        let options = options.unwrap_or(self.defaults);
        let root = root.unwrap_or_else(|| self.doc.body());
        let fingerprint = fingerprint(tracked, &options, root)?;

        let mut active = self
            .active
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;

        if let Some(current) = active.as_ref() {
            if current.fingerprint == fingerprint {
                debug!(
                    "configuration unchanged, reusing session {}",
                    current.session.id()
                );
                return Ok(current.session.subscribe());
            }
        }
        if let Some(mut previous) = active.take() {
            info!(
                "configuration changed, replacing session {}",
                previous.session.id()
            );
            previous.session.detach();
        }

        let session = WatchSession::start(Arc::clone(&self.doc), tracked, options, root)?;
        let receiver = session.subscribe();
        *active = Some(ActiveSession {
            fingerprint,
            session,
        });
        Ok(receiver)
    }

    /// Tear down the active session, if any; idempotent
    pub fn detach(&self) {
        let mut active = match self.active.lock() {
            Ok(guard) => guard,
            Err(e) => {
                warn!("Lock error: {}", e);
                return;
            }
        };
        if let Some(mut previous) = active.take() {
            previous.session.detach();
        }
    }

    pub fn state(&self) -> WatchState {
        self.active
            .lock()
            .ok()
            .and_then(|active| active.as_ref().map(|a| a.session.state()))
            .unwrap_or(WatchState::Idle)
    }

    pub fn is_watching(&self) -> bool {
        self.state() == WatchState::Watching
    }

    /// Id of the active session, if any
    pub fn session_id(&self) -> Option<Uuid> {
        self.active
            .lock()
            .ok()
            .and_then(|active| active.as_ref().map(|a| a.session.id()))
    }

    /// Presence snapshot of the active session, if any
    pub fn current(&self) -> Option<PresenceMap> {
        self.active
            .lock()
            .ok()
            .and_then(|active| active.as_ref().map(|a| a.session.current()))
    }
}

impl std::fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSession")
            .field("session", &self.session)
            .finish()
    }
}
