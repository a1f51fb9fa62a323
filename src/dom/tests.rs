//! DOM 树与变更观察的单元测试

use super::*;
use crate::error::Error;

fn page_with_nav() -> DomTree {
    let tree = DomTree::new();
    let nav = ElementSpec::new("nav").id("menu").child(
        ElementSpec::new("ul").child(
            ElementSpec::new("li")
                .class("item")
                .class("active")
                .attr("data-index", "0"),
        ),
    );
    tree.append_child(tree.body(), nav)
        .expect("Failed to append nav");
    tree
}

#[test]
fn test_scaffold_has_body_under_document() {
    let tree = DomTree::new();

    assert!(tree.contains(tree.document()));
    assert!(tree.tag(tree.document()).is_none());
    assert!(tree.contains(tree.body()));
    assert_eq!(tree.tag(tree.body()).as_deref(), Some("body"));
    assert_eq!(
        tree.query_selector("body").expect("Failed to query"),
        Some(tree.body())
    );
    assert_eq!(tree.node_count(), 3);
}

#[test]
fn test_query_by_id_class_and_attribute() {
    let tree = page_with_nav();

    assert!(tree.query_selector("#menu").unwrap().is_some());
    assert!(tree.query_selector(".item.active").unwrap().is_some());
    assert!(tree.query_selector("[data-index=0]").unwrap().is_some());
    assert!(tree.query_selector(r#"[data-index="0"]"#).unwrap().is_some());
    assert!(tree.query_selector("#missing").unwrap().is_none());
    assert!(tree.query_selector("[data-index=9]").unwrap().is_none());
}

#[test]
fn test_query_with_combinators() {
    let tree = page_with_nav();

    assert!(tree.query_selector("nav li").unwrap().is_some());
    assert!(tree.query_selector("nav > ul > li").unwrap().is_some());
    // li is not a direct child of nav
    assert!(tree.query_selector("nav > li").unwrap().is_none());
    assert!(tree.query_selector("#menu .item").unwrap().is_some());
    assert!(tree.query_selector("ul > [data-index]").unwrap().is_some());
    assert!(tree.query_selector("* > ul").unwrap().is_some());
}

#[test]
fn test_query_selector_groups_match_any() {
    let tree = page_with_nav();

    assert!(tree.query_selector("#missing, .item").unwrap().is_some());
    assert!(tree.query_selector("#missing, .absent").unwrap().is_none());
}

#[test]
fn test_query_returns_first_in_document_order() {
    let tree = DomTree::new();
    let first = tree
        .append_child(tree.body(), ElementSpec::new("p").class("note"))
        .unwrap();
    tree.append_child(tree.body(), ElementSpec::new("p").class("note"))
        .unwrap();

    assert_eq!(tree.query_selector(".note").unwrap(), Some(first));
    assert_eq!(tree.query_selector_all(".note").unwrap().len(), 2);
}

#[test]
fn test_query_selector_rejects_malformed_input() {
    let tree = DomTree::new();

    let err = tree.query_selector("div >").unwrap_err();
    assert!(matches!(err, Error::MalformedSelector(_)));
    assert!(err.to_string().starts_with("Malformed selector"));
}

#[test]
fn test_remove_node_disconnects_subtree() {
    let tree = page_with_nav();
    let nav = tree.query_selector("#menu").unwrap().expect("nav missing");
    let li = tree.query_selector("li").unwrap().expect("li missing");

    tree.remove_node(nav).expect("Failed to remove nav");

    assert!(!tree.contains(nav));
    assert!(!tree.contains(li));
    assert!(tree.query_selector("#menu").unwrap().is_none());
    assert!(tree.query_selector("li").unwrap().is_none());

    // Already detached
    assert!(matches!(
        tree.remove_node(nav),
        Err(Error::NodeNotFound(_))
    ));
}

#[test]
fn test_append_to_unknown_parent_fails() {
    let tree = DomTree::new();

    let result = tree.append_child(NodeId(999), ElementSpec::new("div"));
    assert!(matches!(result, Err(Error::NodeNotFound(_))));
}

#[test]
fn test_observer_receives_append_batch() {
    let tree = DomTree::new();
    let mut feed = tree
        .observe(tree.body(), ObserveOptions::default())
        .expect("Failed to observe");
    assert_eq!(feed.root(), tree.body());
    assert_eq!(feed.options(), ObserveOptions::default());

    let id = tree
        .append_child(tree.body(), ElementSpec::new("div").id("late"))
        .unwrap();

    let batch = feed.try_recv().expect("no batch delivered");
    assert!(batch.has_additions());
    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].target, tree.body());
    assert_eq!(batch.records[0].added, vec![id]);
    assert!(batch.records[0].removed.is_empty());
}

#[test]
fn test_observer_receives_removal_batch() {
    let tree = DomTree::new();
    let child = tree
        .append_child(tree.body(), ElementSpec::new("div"))
        .unwrap();
    let mut feed = tree
        .observe(tree.body(), ObserveOptions::default())
        .expect("Failed to observe");

    tree.remove_node(child).unwrap();

    let batch = feed.try_recv().expect("no batch delivered");
    assert!(!batch.has_additions());
    assert_eq!(batch.records[0].removed, vec![child]);
}

#[test]
fn test_append_children_delivers_one_batch() {
    let tree = DomTree::new();
    let mut feed = tree
        .observe(tree.body(), ObserveOptions::default())
        .expect("Failed to observe");

    let ids = tree
        .append_children(
            tree.body(),
            vec![
                ElementSpec::new("section").id("a"),
                ElementSpec::new("section").id("b"),
            ],
        )
        .unwrap();

    let batch = feed.try_recv().expect("no batch delivered");
    assert_eq!(batch.records.len(), 2);
    assert_eq!(batch.records[0].added, vec![ids[0]]);
    assert_eq!(batch.records[1].added, vec![ids[1]]);
    assert!(feed.try_recv().is_none());
}

#[test]
fn test_subtree_option_scopes_delivery() {
    let tree = DomTree::new();
    let parent = tree
        .append_child(tree.body(), ElementSpec::new("div").id("parent"))
        .unwrap();

    let mut shallow = tree
        .observe(
            tree.body(),
            ObserveOptions {
                child_list: true,
                subtree: false,
            },
        )
        .expect("Failed to observe");

    // Grandchild append: target is `parent`, not the observed body
    tree.append_child(parent, ElementSpec::new("span")).unwrap();
    assert!(shallow.try_recv().is_none());

    // Direct child append is still in scope
    tree.append_child(tree.body(), ElementSpec::new("span"))
        .unwrap();
    assert!(shallow.try_recv().is_some());
}

#[test]
fn test_child_list_disabled_delivers_nothing() {
    let tree = DomTree::new();
    let mut feed = tree
        .observe(
            tree.body(),
            ObserveOptions {
                child_list: false,
                subtree: true,
            },
        )
        .expect("Failed to observe");

    tree.append_child(tree.body(), ElementSpec::new("div"))
        .unwrap();

    assert!(feed.try_recv().is_none());
    assert_eq!(tree.observer_count(), 1);
}

#[test]
fn test_observer_rooted_in_subtree_ignores_siblings() {
    let tree = DomTree::new();
    let left = tree
        .append_child(tree.body(), ElementSpec::new("div").id("left"))
        .unwrap();
    let right = tree
        .append_child(tree.body(), ElementSpec::new("div").id("right"))
        .unwrap();

    let mut feed = tree
        .observe(left, ObserveOptions::default())
        .expect("Failed to observe");

    tree.append_child(right, ElementSpec::new("span")).unwrap();
    assert!(feed.try_recv().is_none());

    tree.append_child(left, ElementSpec::new("span")).unwrap();
    assert!(feed.try_recv().is_some());
}

#[test]
fn test_attribute_writes_are_not_dispatched() {
    let tree = DomTree::new();
    let div = tree
        .append_child(tree.body(), ElementSpec::new("div"))
        .unwrap();
    let mut feed = tree
        .observe(tree.body(), ObserveOptions::default())
        .expect("Failed to observe");

    tree.set_attribute(div, "data-state", "ready").unwrap();

    assert!(feed.try_recv().is_none());
    assert_eq!(tree.attribute(div, "data-state").as_deref(), Some("ready"));
    assert!(tree.query_selector("[data-state=ready]").unwrap().is_some());
}

#[test]
fn test_disconnect_stops_delivery_but_drains_queue() {
    let tree = DomTree::new();
    let mut feed = tree
        .observe(tree.body(), ObserveOptions::default())
        .expect("Failed to observe");

    tree.append_child(tree.body(), ElementSpec::new("div"))
        .unwrap();
    feed.disconnect();
    assert_eq!(tree.observer_count(), 0);
    assert!(feed.is_disconnected());

    // Queued before the disconnect, still readable
    assert!(feed.try_recv().is_some());

    tree.append_child(tree.body(), ElementSpec::new("div"))
        .unwrap();
    assert!(feed.try_recv().is_none());
}

#[test]
fn test_dropping_feed_removes_registration() {
    let tree = DomTree::new();
    let feed = tree
        .observe(tree.body(), ObserveOptions::default())
        .expect("Failed to observe");
    assert_eq!(tree.observer_count(), 1);

    drop(feed);
    assert_eq!(tree.observer_count(), 0);
}

#[test]
fn test_observer_handle_disconnects_from_outside() {
    let tree = DomTree::new();
    let mut feed = tree
        .observe(tree.body(), ObserveOptions::default())
        .expect("Failed to observe");
    let handle = feed.handle();
    assert!(handle.is_connected());
    assert_eq!(handle.id(), feed.id());

    handle.disconnect();

    assert!(!handle.is_connected());
    assert_eq!(tree.observer_count(), 0);
    tree.append_child(tree.body(), ElementSpec::new("div"))
        .unwrap();
    assert!(feed.try_recv().is_none());
}

#[test]
fn test_observe_unknown_root_fails() {
    let tree = DomTree::new();

    let result = tree.observe(NodeId(42), ObserveOptions::default());
    assert!(matches!(result, Err(Error::NodeNotFound(_))));
}

#[tokio::test]
async fn test_async_recv_sees_later_mutation() {
    let tree = std::sync::Arc::new(DomTree::new());
    let mut feed = tree
        .observe(tree.body(), ObserveOptions::default())
        .expect("Failed to observe");

    let writer = tree.clone();
    let task = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        writer
            .append_child(writer.body(), ElementSpec::new("div").id("async"))
            .expect("Failed to append");
    });

    let batch = feed.recv().await.expect("feed closed early");
    assert!(batch.has_additions());
    task.await.expect("writer task failed");
}
