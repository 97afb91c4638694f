use crate::index::{QueryIndex, SharedQueryIndex};
use crate::update::{DocSubscriber, DocUpdate};
use crate::NodeKey;
use anyhow::Error;
use indextree::{Arena, NodeId};
use log::trace;
use smallvec::SmallVec;
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc};

#[derive(Debug, Clone, Default)]
pub enum NodeKind {
    #[default]
    Document,
    Element {
        tag: String,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DocNode {
    pub key: NodeKey,
    pub kind: NodeKind,
    pub attrs: SmallVec<(String, String), 4>,
}

/// The canonical document: an arena-backed tree fed by an update intake and
/// mirrored to subscribers.
///
/// Applying a batch updates the tree and the shared query index first, then
/// broadcasts the batch, so any subscriber notified of a batch can lock the
/// index and observe a state at least as new as that batch.
pub struct Document {
    arena: Arena<DocNode>,
    root: NodeId,
    keys: HashMap<NodeKey, NodeId>,
    update_sender: broadcast::Sender<Vec<DocUpdate>>,
    in_receiver: mpsc::Receiver<Vec<DocUpdate>>,
    index: QueryIndex,
    shared_index: SharedQueryIndex,
    end_seen: bool,
}

impl Document {
    /// Create a document over caller-provided channels: `update_sender` fans
    /// applied batches out to subscribers, `in_receiver` is the mutation
    /// intake.
    pub fn new(
        update_sender: broadcast::Sender<Vec<DocUpdate>>,
        in_receiver: mpsc::Receiver<Vec<DocUpdate>>,
    ) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(DocNode {
            key: NodeKey::ROOT,
            kind: NodeKind::Document,
            attrs: SmallVec::new(),
        });
        let (index, shared_index) = QueryIndex::new();
        Self {
            arena,
            root,
            keys: HashMap::from([(NodeKey::ROOT, root)]),
            update_sender,
            in_receiver,
            index,
            shared_index,
            end_seen: false,
        }
    }

    /// Subscribe to applied update batches.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<DocUpdate>> {
        self.update_sender.subscribe()
    }

    /// Handle to the shared query index this document keeps in sync.
    pub fn shared_index(&self) -> SharedQueryIndex {
        self.shared_index.clone()
    }

    /// Whether an `EndOfDocument` update has been applied.
    pub fn end_seen(&self) -> bool {
        self.end_seen
    }

    /// Non-blocking drain of the intake: apply and re-broadcast every batch
    /// currently queued.
    pub fn update(&mut self) -> Result<(), Error> {
        while let Ok(batch) = self.in_receiver.try_recv() {
            self.apply_batch(batch)?;
        }
        Ok(())
    }

    /// Await one batch from the intake and apply it. Returns `false` once
    /// the intake has closed and drained.
    pub async fn pump(&mut self) -> Result<bool, Error> {
        match self.in_receiver.recv().await {
            Some(batch) => {
                self.apply_batch(batch)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drive the document until its intake closes.
    pub async fn run(mut self) -> Result<(), Error> {
        while self.pump().await? {}
        Ok(())
    }

    fn apply_batch(&mut self, batch: Vec<DocUpdate>) -> Result<(), Error> {
        for update in &batch {
            self.apply_update(update);
            self.index.apply_update(update.clone())?;
        }
        // A send with no live subscribers is not an error; watchers come and go.
        if self.update_sender.send(batch).is_err() {
            trace!("document: no subscribers for applied batch");
        }
        Ok(())
    }

    fn apply_update(&mut self, update: &DocUpdate) {
        use DocUpdate::*;

        match update {
            InsertElement {
                parent,
                node,
                tag,
                pos,
            } => {
                self.insert_node(
                    *parent,
                    *node,
                    NodeKind::Element { tag: tag.clone() },
                    *pos,
                );
            }
            InsertText {
                parent,
                node,
                text,
                pos,
            } => {
                self.insert_node(
                    *parent,
                    *node,
                    NodeKind::Text { text: text.clone() },
                    *pos,
                );
            }
            SetAttr { node, name, value } => {
                let Some(node_id) = self.keys.get(node).copied() else {
                    trace!("document: SetAttr on unknown node {node}");
                    return;
                };
                let Some(data) = self.arena.get_mut(node_id) else {
                    return;
                };
                let attrs = &mut data.get_mut().attrs;
                if let Some(existing) = attrs.iter_mut().find(|(n, _)| n == name) {
                    existing.1 = value.clone();
                } else {
                    attrs.push((name.clone(), value.clone()));
                }
            }
            RemoveNode { node } => self.remove_subtree(*node),
            EndOfDocument => self.end_seen = true,
        }
    }

    fn insert_node(&mut self, parent: NodeKey, node: NodeKey, kind: NodeKind, pos: usize) {
        let Some(parent_id) = self.keys.get(&parent).copied() else {
            trace!("document: insert under unknown parent {parent}");
            return;
        };
        let new_id = self.arena.new_node(DocNode {
            key: node,
            kind,
            attrs: SmallVec::new(),
        });
        let at = parent_id.children(&self.arena).nth(pos);
        match at {
            Some(sibling) => sibling.insert_before(new_id, &mut self.arena),
            None => parent_id.append(new_id, &mut self.arena),
        }
        self.keys.insert(node, new_id);
    }

    fn remove_subtree(&mut self, node: NodeKey) {
        let Some(node_id) = self.keys.get(&node).copied() else {
            trace!("document: remove of unknown node {node}");
            return;
        };
        if node_id == self.root {
            trace!("document: refusing to remove the root node");
            return;
        }
        let removed: Vec<NodeKey> = node_id
            .descendants(&self.arena)
            .filter_map(|id| self.arena.get(id).map(|n| n.get().key))
            .collect();
        node_id.remove_subtree(&mut self.arena);
        for key in removed {
            self.keys.remove(&key);
        }
    }

    /// Whether the given node is currently in the tree.
    pub fn contains(&self, node: NodeKey) -> bool {
        self.keys.contains_key(&node)
    }

    /// Tag name of the given node, if it is an element.
    pub fn tag_name(&self, node: NodeKey) -> Option<&str> {
        let data = self.keys.get(&node).and_then(|id| self.arena.get(*id))?;
        match &data.get().kind {
            NodeKind::Element { tag } => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Value of an attribute on the given node, if present.
    pub fn attr(&self, node: NodeKey, name: &str) -> Option<&str> {
        let data = self.keys.get(&node).and_then(|id| self.arena.get(*id))?;
        data.get()
            .attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of element nodes currently in the tree.
    pub fn element_count(&self) -> usize {
        self.root
            .descendants(&self.arena)
            .filter(|id| {
                self.arena
                    .get(*id)
                    .is_some_and(|n| matches!(n.get().kind, NodeKind::Element { .. }))
            })
            .count()
    }
}
