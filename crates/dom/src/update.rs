use crate::NodeKey;
use anyhow::Error;

/// A single structural mutation in the document's update stream.
///
/// Updates are delivered in batches (`Vec<DocUpdate>`); a batch is applied
/// atomically with respect to queries on the shared index.
#[derive(Debug, Clone)]
pub enum DocUpdate {
    InsertElement {
        parent: NodeKey,
        node: NodeKey,
        tag: String,
        pos: usize,
    },
    InsertText {
        parent: NodeKey,
        node: NodeKey,
        text: String,
        pos: usize,
    },
    SetAttr {
        node: NodeKey,
        name: String,
        value: String,
    },
    RemoveNode {
        node: NodeKey,
    },
    EndOfDocument,
}

/// The seam every document mirror implements: apply one update, keeping the
/// mirror's state consistent with the stream seen so far.
pub trait DocSubscriber {
    fn apply_update(&mut self, update: DocUpdate) -> Result<(), Error>;
}
