//! Common test utilities
//!
//! This module provides shared fixtures and helpers for all integration tests.

use domwatch::{DomTree, ElementSpec, PresenceMap, TrackedSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Install a test subscriber honoring RUST_LOG; safe to call more than once
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a small landing page: header and a nav with two items, no modal yet
pub fn setup_landing_page(tree: &DomTree) -> Result<(), Box<dyn std::error::Error>> {
    tree.append_child(
        tree.body(),
        ElementSpec::new("header").id("header").child(
            ElementSpec::new("h1").class("title"),
        ),
    )?;
    tree.append_child(
        tree.body(),
        ElementSpec::new("nav").id("menu").child(
            ElementSpec::new("ul")
                .child(ElementSpec::new("li").class("item"))
                .child(ElementSpec::new("li").class("item")),
        ),
    )?;
    Ok(())
}

/// Build a tracked set from name/selector pairs
pub fn tracked(pairs: &[(&str, &str)]) -> TrackedSet {
    pairs.iter().copied().collect()
}

/// Append a subtree after a delay, the way a page script would
pub fn append_after(
    tree: &Arc<DomTree>,
    parent: domwatch::NodeId,
    spec: ElementSpec,
    delay_ms: u64,
) -> JoinHandle<()> {
    let tree = Arc::clone(tree);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        tree.append_child(parent, spec)
            .expect("Failed to append delayed subtree");
    })
}

/// Wait for the next publication with a test-sized timeout
pub async fn next_publication(
    receiver: &mut watch::Receiver<PresenceMap>,
) -> Result<PresenceMap, Box<dyn std::error::Error>> {
    tokio::time::timeout(Duration::from_secs(2), receiver.changed()).await??;
    Ok(receiver.borrow_and_update().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_landing_page_fixture() {
        let tree = DomTree::new();
        setup_landing_page(&tree).unwrap();

        assert!(tree.query_selector("#header").unwrap().is_some());
        assert_eq!(tree.query_selector_all("nav .item").unwrap().len(), 2);
        assert!(tree.query_selector("#modal").unwrap().is_none());
    }
}
