//! A query index mirror for element lookups (first selector match, elements
//! by tag name, element by id).
//!
//! The index subscribes to document update batches and maintains small
//! per-node records plus reverse indices. It is intentionally minimal: it
//! tracks only what selector and tag queries need. The document applies
//! updates to the shared state *before* broadcasting them, so a notified
//! subscriber that locks the index always observes a state at least as new
//! as its notification.

use crate::selector::ClassSelector;
use crate::update::{DocSubscriber, DocUpdate};
use crate::NodeKey;
use anyhow::{Error, Result, anyhow};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Shared handle to the query state, lockable from any subscriber.
pub type SharedQueryIndex = Arc<Mutex<QueryIndexState>>;

/// Internal mutable state for the query index.
#[derive(Default)]
pub struct QueryIndexState {
    /// Element node -> tag name, lowercase.
    tag_by_key: HashMap<NodeKey, String>,
    /// Element node -> id attribute value (if any).
    id_by_key: HashMap<NodeKey, String>,
    /// Element node -> class tokens, lowercase.
    classes_by_key: HashMap<NodeKey, HashSet<String>>,
    /// Parent -> children in document order, for walks and recursive removal.
    children_by_parent: HashMap<NodeKey, Vec<NodeKey>>,
    /// Child -> parent.
    parent_by_child: HashMap<NodeKey, NodeKey>,
    /// Text node -> content.
    text_by_key: HashMap<NodeKey, String>,
}

impl QueryIndexState {
    /// Document-order walk over element nodes, stopping at the first node
    /// the visitor accepts.
    fn find_first(&self, accept: &impl Fn(&QueryIndexState, NodeKey) -> bool) -> Option<NodeKey> {
        fn walk(
            state: &QueryIndexState,
            node: NodeKey,
            accept: &impl Fn(&QueryIndexState, NodeKey) -> bool,
        ) -> Option<NodeKey> {
            if state.tag_by_key.contains_key(&node) && accept(state, node) {
                return Some(node);
            }
            for child in state.children_by_parent.get(&node).into_iter().flatten() {
                if let Some(found) = walk(state, *child, accept) {
                    return Some(found);
                }
            }
            None
        }
        walk(self, NodeKey::ROOT, accept)
    }

    /// First element carrying every class of the selector, in document order.
    pub fn first_match(&self, selector: &ClassSelector) -> Option<NodeKey> {
        self.find_first(&|state, node| {
            state
                .classes_by_key
                .get(&node)
                .is_some_and(|classes| selector.classes().iter().all(|c| classes.contains(c)))
        })
    }

    /// All elements with the given tag name (ASCII case-insensitive), in
    /// document order.
    pub fn elements_by_tag_name(&self, tag: &str) -> Vec<NodeKey> {
        let needle = tag.to_ascii_lowercase();
        let mut out = Vec::new();
        fn walk(state: &QueryIndexState, node: NodeKey, needle: &str, out: &mut Vec<NodeKey>) {
            if state.tag_by_key.get(&node).is_some_and(|t| t == needle) {
                out.push(node);
            }
            for child in state.children_by_parent.get(&node).into_iter().flatten() {
                walk(state, *child, needle, out);
            }
        }
        walk(self, NodeKey::ROOT, &needle, &mut out);
        out
    }

    /// The element with the given id (case-sensitive, first writer wins on
    /// duplicates), if any.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeKey> {
        self.find_first(&|state, node| state.id_by_key.get(&node).is_some_and(|v| v == id))
    }

    /// Concatenated text content of the node's descendant text nodes.
    pub fn text_content(&self, node: NodeKey) -> String {
        fn collect(state: &QueryIndexState, current: NodeKey, out: &mut String) {
            if let Some(text) = state.text_by_key.get(&current) {
                out.push_str(text);
            }
            for child in state.children_by_parent.get(&current).into_iter().flatten() {
                collect(state, *child, out);
            }
        }
        let mut out = String::new();
        collect(self, node, &mut out);
        out
    }

    /// Number of element nodes currently indexed.
    pub fn element_count(&self) -> usize {
        self.tag_by_key.len()
    }

    fn insert_child(&mut self, parent: NodeKey, node: NodeKey, pos: usize) {
        self.parent_by_child.insert(node, parent);
        let siblings = self.children_by_parent.entry(parent).or_default();
        if !siblings.contains(&node) {
            let at = pos.min(siblings.len());
            siblings.insert(at, node);
        }
    }

    fn set_classes(&mut self, node: NodeKey, class_attr: &str) {
        let tokens: HashSet<String> = class_attr
            .split_whitespace()
            .map(|t| t.to_ascii_lowercase())
            .collect();
        if tokens.is_empty() {
            self.classes_by_key.remove(&node);
        } else {
            self.classes_by_key.insert(node, tokens);
        }
    }

    /// Remove a node and all of its descendants from every index.
    fn remove_recursively(&mut self, node: NodeKey) {
        if let Some(children) = self.children_by_parent.remove(&node) {
            for child in children {
                self.remove_recursively(child);
            }
        }
        if let Some(parent) = self.parent_by_child.remove(&node)
            && let Some(siblings) = self.children_by_parent.get_mut(&parent)
        {
            siblings.retain(|c| *c != node);
        }
        self.tag_by_key.remove(&node);
        self.id_by_key.remove(&node);
        self.classes_by_key.remove(&node);
        self.text_by_key.remove(&node);
    }
}

/// A [`DocSubscriber`] that keeps a [`SharedQueryIndex`] current.
#[derive(Clone)]
pub struct QueryIndex {
    inner: SharedQueryIndex,
}

impl QueryIndex {
    /// Create the subscriber and the shared state handle it maintains.
    pub fn new() -> (Self, SharedQueryIndex) {
        let inner = Arc::new(Mutex::new(QueryIndexState::default()));
        (
            Self {
                inner: inner.clone(),
            },
            inner,
        )
    }
}

impl DocSubscriber for QueryIndex {
    fn apply_update(&mut self, update: DocUpdate) -> Result<(), Error> {
        use DocUpdate::*;
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow!("query index state poisoned"))?;
        match update {
            InsertElement {
                parent,
                node,
                tag,
                pos,
            } => {
                guard.insert_child(parent, node, pos);
                guard.tag_by_key.insert(node, tag.to_ascii_lowercase());
            }
            InsertText {
                parent,
                node,
                text,
                pos,
            } => {
                guard.insert_child(parent, node, pos);
                guard.text_by_key.insert(node, text);
            }
            SetAttr { node, name, value } => {
                if name.eq_ignore_ascii_case("id") {
                    if value.is_empty() {
                        guard.id_by_key.remove(&node);
                    } else {
                        guard.id_by_key.insert(node, value);
                    }
                } else if name.eq_ignore_ascii_case("class") {
                    guard.set_classes(node, &value);
                }
            }
            RemoveNode { node } => {
                guard.remove_recursively(node);
            }
            EndOfDocument => {}
        }
        Ok(())
    }
}
