//! Document model and structural-mutation primitives shared across Vigil
//! subsystems (page loading, watchers, the demo binary).
//!
//! The [`Document`] owns the canonical tree and fans applied update batches
//! out to subscribers; the [`QueryIndex`] mirror answers synchronous
//! selector and tag lookups against shared state.

/// Streamed mutation protocol and the subscriber seam.
pub mod update;
pub use update::{DocSubscriber, DocUpdate};

/// The canonical, arena-backed document tree.
pub mod tree;
pub use tree::{DocNode, Document, NodeKind};

/// Index mirror for element lookups by selector, tag, and id.
pub mod index;
pub use index::{QueryIndex, QueryIndexState, SharedQueryIndex};

/// Compound class selectors.
pub mod selector;
pub use selector::ClassSelector;

/// HTML parsing into the update protocol.
pub mod parser;
pub use parser::{HtmlParser, parse_html};

/// A 64-bit stable key for document nodes used to correlate asynchronous
/// updates across subscribers.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// The document root key (always present).
    pub const ROOT: NodeKey = NodeKey(0);
}

impl core::fmt::Display for NodeKey {
    fn fmt(&self, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}
