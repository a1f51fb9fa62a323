//! Settling helpers built on the presence channel

use crate::error::{Error, Result};
use crate::watcher::presence::PresenceMap;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Wait until every tracked element is present and return that mapping
///
/// Resolves immediately if the current mapping is already settled. Fails if
/// the channel closes first, which means the session was torn down while
/// elements were still missing.
pub async fn wait_settled(receiver: &mut watch::Receiver<PresenceMap>) -> Result<PresenceMap> {
    let map = receiver
        .wait_for(PresenceMap::all_present)
        .await
        .map_err(|_| Error::internal("watch channel closed before all elements appeared"))?;
    Ok(map.clone())
}

/// The presence channel as an async stream
///
/// Yields the mapping current at call time first, then every subsequent
/// publication. Intermediate mappings may be skipped if the consumer lags;
/// the latest one is always delivered.
pub fn presence_stream(receiver: watch::Receiver<PresenceMap>) -> WatchStream<PresenceMap> {
    WatchStream::new(receiver)
}
