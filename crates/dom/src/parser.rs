//! HTML5 parsing into the document update protocol.

use crate::update::DocUpdate;
use crate::NodeKey;
use anyhow::{Error, anyhow};
use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

/// HTML parser that converts parsed documents into [`DocUpdate`] sequences.
///
/// The parser owns the `NodeKey` counter, so several parses through one
/// parser never reuse keys within a session.
pub struct HtmlParser {
    next_key: u64,
}

impl HtmlParser {
    pub fn new() -> Self {
        // Key 0 is reserved for the document root.
        Self { next_key: 1 }
    }

    fn create_key(&mut self) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key += 1;
        key
    }

    /// Parse an HTML string into an update sequence rooted at
    /// [`NodeKey::ROOT`], terminated by [`DocUpdate::EndOfDocument`].
    pub fn parse(&mut self, html: &str) -> Result<Vec<DocUpdate>, Error> {
        let opts = ParseOpts::default();
        let rc_dom: RcDom = parse_document(RcDom::default(), opts)
            .from_utf8()
            .read_from(&mut html.as_bytes())
            .map_err(|err| anyhow!("failed to parse HTML: {err}"))?;

        let mut updates = Vec::new();
        let mut pos = 0;
        for child in rc_dom.document.children.borrow().iter() {
            if self.convert_node(child, NodeKey::ROOT, pos, &mut updates) {
                pos += 1;
            }
        }
        updates.push(DocUpdate::EndOfDocument);
        Ok(updates)
    }

    /// Convert one parsed node (and its subtree) into updates. Returns
    /// whether a node was emitted, so callers can track child positions.
    fn convert_node(
        &mut self,
        rc_node: &Handle,
        parent: NodeKey,
        pos: usize,
        updates: &mut Vec<DocUpdate>,
    ) -> bool {
        match &rc_node.data {
            RcNodeData::Element { name, attrs, .. } => {
                let node = self.create_key();
                updates.push(DocUpdate::InsertElement {
                    parent,
                    node,
                    tag: name.local.to_string(),
                    pos,
                });
                for attr in attrs.borrow().iter() {
                    updates.push(DocUpdate::SetAttr {
                        node,
                        name: attr.name.local.to_string(),
                        value: attr.value.to_string(),
                    });
                }
                let mut child_pos = 0;
                for child in rc_node.children.borrow().iter() {
                    if self.convert_node(child, node, child_pos, updates) {
                        child_pos += 1;
                    }
                }
                true
            }

            RcNodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                // Skip whitespace-only text nodes.
                if text.trim().is_empty() {
                    return false;
                }
                let node = self.create_key();
                updates.push(DocUpdate::InsertText {
                    parent,
                    node,
                    text,
                    pos,
                });
                true
            }

            // Doctypes, comments, and processing instructions carry no
            // structure the index or watchers care about.
            RcNodeData::Document
            | RcNodeData::Doctype { .. }
            | RcNodeData::Comment { .. }
            | RcNodeData::ProcessingInstruction { .. } => false,
        }
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience: parse a standalone HTML string with a fresh parser.
pub fn parse_html(html: &str) -> Result<Vec<DocUpdate>, Error> {
    HtmlParser::new().parse(html)
}
