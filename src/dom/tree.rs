//! In-memory document tree
//!
//! Arena-backed DOM with a fixed `document -> html -> body` scaffold. Every
//! structural mutation goes through [`DomTree::append_child`],
//! [`DomTree::append_children`] or [`DomTree::remove_node`], each of which
//! dispatches one [`MutationBatch`] to the observers whose root and options
//! cover the change. Attribute writes dispatch nothing; feeds carry
//! child-list changes only.

use crate::dom::observer::{MutationFeed, ObserverEntry, ObserverRegistry};
use crate::dom::selector::{AttributeCondition, Combinator, CompoundSelector, Selector, SelectorPart};
use crate::dom::traits::{
    DomDocument, MutationBatch, MutationRecord, NodeId, ObserveOptions, ObserverId,
};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// Declarative description of an element subtree to insert
#[derive(Debug, Clone)]
pub struct ElementSpec {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    children: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            classes: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }

    fn into_parts(self) -> (ElementData, Vec<ElementSpec>) {
        let mut attributes: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in self.attributes {
            attributes.insert(name, value);
        }
        if let Some(id) = self.id {
            attributes.insert("id".to_string(), id);
        }
        if !self.classes.is_empty() {
            attributes.insert("class".to_string(), self.classes.join(" "));
        }
        (
            ElementData {
                tag: self.tag.to_ascii_lowercase(),
                attributes,
            },
            self.children,
        )
    }
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attributes: BTreeMap<String, String>,
}

impl ElementData {
    fn named(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
        }
    }

    fn id(&self) -> Option<&str> {
        self.attributes.get("id").map(String::as_str)
    }

    fn has_class(&self, class: &str) -> bool {
        self.attributes
            .get("class")
            .map(|list| list.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

#[derive(Debug)]
enum NodeKind {
    Document,
    Element(ElementData),
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug)]
struct TreeInner {
    nodes: Vec<Node>,
}

impl TreeInner {
    fn build_subtree(&mut self, parent: NodeId, spec: ElementSpec) -> NodeId {
        let (data, children) = spec.into_parts();
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            kind: NodeKind::Element(data),
        });
        self.nodes[parent.0].children.push(id);
        for child in children {
            self.build_subtree(id, child);
        }
        id
    }

    fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element(data) => Some(data),
            NodeKind::Document => None,
        }
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    /// Preorder search for the first node matching `selector`
    fn first_match(&self, start: NodeId, selector: &Selector) -> Option<NodeId> {
        if self.matches_selector(start, selector) {
            return Some(start);
        }
        let node = self.nodes.get(start.0)?;
        for &child in &node.children {
            if let Some(found) = self.first_match(child, selector) {
                return Some(found);
            }
        }
        None
    }

    fn collect_matches(&self, start: NodeId, selector: &Selector, out: &mut Vec<NodeId>) {
        if self.matches_selector(start, selector) {
            out.push(start);
        }
        if let Some(node) = self.nodes.get(start.0) {
            for &child in &node.children {
                self.collect_matches(child, selector, out);
            }
        }
    }

    fn matches_selector(&self, node: NodeId, selector: &Selector) -> bool {
        selector
            .groups()
            .iter()
            .any(|group| self.matches_chain(node, &group.parts))
    }

    /// Right-to-left chain matching: the last step must match `node`, earlier
    /// steps are resolved against its ancestry with backtracking.
    fn matches_chain(&self, node: NodeId, parts: &[SelectorPart]) -> bool {
        let (last, prefix) = match parts.split_last() {
            Some(split) => split,
            None => return false,
        };
        if !self.matches_compound(node, &last.compound) {
            return false;
        }
        if prefix.is_empty() {
            return true;
        }
        match last.combinator.unwrap_or(Combinator::Descendant) {
            Combinator::Child => match self.parent_of(node) {
                Some(parent) => self.matches_chain(parent, prefix),
                None => false,
            },
            Combinator::Descendant => {
                let mut cursor = self.parent_of(node);
                while let Some(ancestor) = cursor {
                    if self.matches_chain(ancestor, prefix) {
                        return true;
                    }
                    cursor = self.parent_of(ancestor);
                }
                false
            }
        }
    }

    fn matches_compound(&self, node: NodeId, compound: &CompoundSelector) -> bool {
        let element = match self.element(node) {
            Some(element) => element,
            None => return false,
        };
        if let Some(tag) = &compound.tag {
            if element.tag != *tag {
                return false;
            }
        }
        if let Some(id) = &compound.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        compound.classes.iter().all(|class| element.has_class(class))
            && compound.attributes.iter().all(|condition| match condition {
                AttributeCondition::Exists { name } => element.attributes.contains_key(name),
                AttributeCondition::Equals { name, value } => {
                    element.attributes.get(name) == Some(value)
                }
            })
    }
}

/// Thread-safe in-memory document
#[derive(Debug)]
pub struct DomTree {
    inner: RwLock<TreeInner>,
    observers: ObserverRegistry,
    next_observer_id: AtomicU64,
    document: NodeId,
    body: NodeId,
}

impl DomTree {
    /// An empty document with the `document -> html -> body` scaffold
    pub fn new() -> Self {
        let nodes = vec![
            Node {
                parent: None,
                children: vec![NodeId(1)],
                kind: NodeKind::Document,
            },
            Node {
                parent: Some(NodeId(0)),
                children: vec![NodeId(2)],
                kind: NodeKind::Element(ElementData::named("html")),
            },
            Node {
                parent: Some(NodeId(1)),
                children: Vec::new(),
                kind: NodeKind::Element(ElementData::named("body")),
            },
        ];
        Self {
            inner: RwLock::new(TreeInner { nodes }),
            observers: Arc::new(Mutex::new(Vec::new())),
            next_observer_id: AtomicU64::new(1),
            document: NodeId(0),
            body: NodeId(2),
        }
    }

    /// The document root
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// The `<body>` node
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Total number of nodes ever created, detached ones included
    pub fn node_count(&self) -> usize {
        self.inner.read().map(|inner| inner.nodes.len()).unwrap_or(0)
    }

    /// Currently registered observers
    pub fn observer_count(&self) -> usize {
        self.observers.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Insert one subtree under `parent` and notify observers
    pub fn append_child(&self, parent: NodeId, spec: ElementSpec) -> Result<NodeId> {
        let record;
        let new_id;
        {
            let mut inner = self
                .inner
                .write()
                .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
            if inner.nodes.get(parent.0).is_none() {
                return Err(Error::node_not_found(parent.to_string()));
            }
            new_id = inner.build_subtree(parent, spec);
            record = MutationRecord {
                target: parent,
                added: vec![new_id],
                removed: Vec::new(),
            };
        }
        self.dispatch(parent, vec![record]);
        Ok(new_id)
    }

    /// Insert several subtrees under `parent`, notifying observers with a
    /// single batch carrying one record per subtree
    pub fn append_children(&self, parent: NodeId, specs: Vec<ElementSpec>) -> Result<Vec<NodeId>> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        let mut records = Vec::with_capacity(specs.len());
        let mut new_ids = Vec::with_capacity(specs.len());
        {
            let mut inner = self
                .inner
                .write()
                .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
            if inner.nodes.get(parent.0).is_none() {
                return Err(Error::node_not_found(parent.to_string()));
            }
            for spec in specs {
                let id = inner.build_subtree(parent, spec);
                new_ids.push(id);
                records.push(MutationRecord {
                    target: parent,
                    added: vec![id],
                    removed: Vec::new(),
                });
            }
        }
        self.dispatch(parent, records);
        Ok(new_ids)
    }

    /// Detach a subtree from its parent and notify observers
    ///
    /// The nodes stay in the arena but are no longer connected, so queries
    /// stop seeing them.
    pub fn remove_node(&self, node: NodeId) -> Result<()> {
        let record;
        let parent;
        {
            let mut inner = self
                .inner
                .write()
                .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
            let parent_id = inner
                .nodes
                .get(node.0)
                .ok_or_else(|| Error::node_not_found(node.to_string()))?
                .parent
                .ok_or_else(|| Error::node_not_found(format!("{} is not attached", node)))?;
            let children = &mut inner.nodes[parent_id.0].children;
            if let Some(position) = children.iter().position(|&child| child == node) {
                children.remove(position);
            }
            inner.nodes[node.0].parent = None;
            parent = parent_id;
            record = MutationRecord {
                target: parent_id,
                added: Vec::new(),
                removed: vec![node],
            };
        }
        self.dispatch(parent, vec![record]);
        Ok(())
    }

    /// Set an attribute on an element; observers are not notified
    pub fn set_attribute(
        &self,
        node: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
        match inner.nodes.get_mut(node.0) {
            Some(Node {
                kind: NodeKind::Element(data),
                ..
            }) => {
                data.attributes.insert(name.into(), value.into());
                Ok(())
            }
            Some(_) => Err(Error::internal(format!("{} is not an element", node))),
            None => Err(Error::node_not_found(node.to_string())),
        }
    }

    /// Current value of an attribute, if the node is an element carrying it
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let inner = self.inner.read().ok()?;
        inner.element(node)?.attributes.get(name).cloned()
    }

    /// Tag name of an element node
    pub fn tag(&self, node: NodeId) -> Option<String> {
        let inner = self.inner.read().ok()?;
        Some(inner.element(node)?.tag.clone())
    }

    /// First connected node matching a compiled selector, in document order
    pub fn query(&self, selector: &Selector) -> Option<NodeId> {
        let inner = self.inner.read().ok()?;
        inner.first_match(self.document, selector)
    }

    /// First connected node matching a selector string
    #[instrument(skip(self))]
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        let compiled = Selector::parse(selector)?;
        Ok(self.query(&compiled))
    }

    /// All connected nodes matching a selector string, in document order
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let compiled = Selector::parse(selector)?;
        let inner = self
            .inner
            .read()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
        let mut out = Vec::new();
        inner.collect_matches(self.document, &compiled, &mut out);
        Ok(out)
    }

    /// Whether `node` is connected to the document root
    pub fn contains(&self, node: NodeId) -> bool {
        let inner = match self.inner.read() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        if inner.nodes.get(node.0).is_none() {
            return false;
        }
        let mut cursor = node;
        loop {
            if cursor == self.document {
                return true;
            }
            match inner.nodes[cursor.0].parent {
                Some(parent) => cursor = parent,
                None => return false,
            }
        }
    }

    /// Register a mutation feed rooted at `root`
    #[instrument(skip(self))]
    pub fn observe(&self, root: NodeId, options: ObserveOptions) -> Result<MutationFeed> {
        {
            let inner = self
                .inner
                .read()
                .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
            if inner.nodes.get(root.0).is_none() {
                return Err(Error::node_not_found(root.to_string()));
            }
        }
        let id = ObserverId(self.next_observer_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut observers = self
            .observers
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
        observers.push(ObserverEntry {
            id,
            root,
            options,
            sender,
        });
        debug!(
            "observer {} attached to {} (child_list={}, subtree={})",
            id, root, options.child_list, options.subtree
        );
        Ok(MutationFeed::new(
            id,
            root,
            options,
            receiver,
            self.observers.clone(),
        ))
    }

    /// Deliver records for a mutation at `target` to every observer whose
    /// root and options cover it, pruning feeds whose receiver is gone
    fn dispatch(&self, target: NodeId, records: Vec<MutationRecord>) {
        if records.is_empty() {
            return;
        }
        let chain = self.ancestor_chain(target);
        let batch = MutationBatch { records };
        let mut observers = match self.observers.lock() {
            Ok(guard) => guard,
            Err(e) => {
                warn!("observer registry lock error: {}", e);
                return;
            }
        };
        observers.retain(|entry| {
            if !entry.options.child_list {
                return true;
            }
            let in_scope =
                entry.root == target || (entry.options.subtree && chain.contains(&entry.root));
            if !in_scope {
                return true;
            }
            match entry.sender.send(batch.clone()) {
                Ok(()) => true,
                Err(_) => {
                    debug!("dropping observer {} with closed feed", entry.id);
                    false
                }
            }
        });
    }

    /// `target` and all its ancestors, nearest first
    fn ancestor_chain(&self, target: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let inner = match self.inner.read() {
            Ok(guard) => guard,
            Err(_) => return vec![target],
        };
        let mut cursor = Some(target);
        while let Some(id) = cursor {
            chain.push(id);
            cursor = inner.nodes.get(id.0).and_then(|node| node.parent);
        }
        chain
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomDocument for DomTree {
    fn query(&self, selector: &Selector) -> Option<NodeId> {
        DomTree::query(self, selector)
    }

    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        DomTree::query_selector(self, selector)
    }

    fn body(&self) -> NodeId {
        DomTree::body(self)
    }

    fn contains(&self, node: NodeId) -> bool {
        DomTree::contains(self, node)
    }

    fn observe(&self, root: NodeId, options: ObserveOptions) -> Result<MutationFeed> {
        DomTree::observe(self, root, options)
    }
}
