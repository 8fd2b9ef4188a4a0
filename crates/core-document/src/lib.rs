//! Document collaborator contract and an in-memory reference tree.
//!
//! The dispatcher never touches a concrete tree. It talks to a `Document`: element queries,
//! a handful of mutations, caret and selection access, plain-text measurement, and the event
//! target listener slots. `MemoryDocument` implements the contract over an arena so the
//! dispatcher can be exercised without a browser.
//!
//! Text measurement counts extended grapheme clusters, not bytes or scalar values, so a length
//! cap never splits a user-perceived character.

use core_events::{EventKind, ListenerId};

pub mod history;
pub mod html;
mod memory;

pub use history::{HISTORY_MAX, History, InsertRun, UndoJournal};
pub use html::{decode_entities, encode_html, grapheme_len, truncate_encoded};
pub use memory::MemoryDocument;

/// Opaque node handle. Only meaningful for the document that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Caret location: a node plus an offset (graphemes for text nodes, child index for elements).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub const fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionRange {
    pub anchor: Position,
    pub focus: Position,
}

impl SelectionRange {
    pub const fn collapsed(at: Position) -> Self {
        Self {
            anchor: at,
            focus: at,
        }
    }
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// Restorable capture of the live selection. Held by the paste coordinator across a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionSnapshot(Option<SelectionRange>);

impl SelectionSnapshot {
    pub const fn new(range: Option<SelectionRange>) -> Self {
        Self(range)
    }
    pub fn range(&self) -> Option<SelectionRange> {
        self.0
    }
}

/// Operations the dispatcher consumes from the editable root and its selection.
///
/// `children` and the sibling helpers only see element nodes, matching how structure is
/// reasoned about; text nodes are reachable through `text_content` and the caret.
pub trait Document {
    fn root(&self) -> NodeId;
    /// Element children of `node`, in order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    /// Lowercase element name, `None` for text nodes.
    fn tag_name(&self, node: NodeId) -> Option<&str>;
    fn text_content(&self, node: NodeId) -> String;
    /// Serialized markup of the root's contents.
    fn inner_html(&self) -> String;
    /// Replace the root's contents. Clears the selection.
    fn set_inner_html(&mut self, html: &str);

    /// Insert a new empty element right after `reference` and return it.
    fn insert_element_after(&mut self, reference: NodeId, tag: &str) -> NodeId;
    fn remove_node(&mut self, node: NodeId);
    /// Insert an empty element at the caret and move the caret after it.
    fn insert_tag_at_caret(&mut self, tag: &str) -> Option<NodeId>;
    /// Insert markup at the caret, replacing a non-collapsed selection.
    fn insert_html_at_caret(&mut self, html: &str);

    fn set_caret(&mut self, node: NodeId, offset: usize);
    /// Direct child of the root that contains the caret.
    fn caret_context(&self) -> Option<NodeId>;
    /// Selection anchor node, when a selection API is present and a selection exists.
    fn anchor_node(&self) -> Option<NodeId>;
    /// Focused element, used when no selection API is available.
    fn active_element(&self) -> Option<NodeId>;
    fn has_selection_api(&self) -> bool;
    /// `true` when there is no selection or it is collapsed.
    fn is_selection_collapsed(&self) -> bool;
    fn save_selection(&self) -> SelectionSnapshot;
    fn restore_selection(&mut self, snapshot: &SelectionSnapshot);
    fn focus(&mut self);

    fn add_listener(&mut self, kind: EventKind) -> ListenerId;
    /// Returns `false` if `id` was not attached.
    fn remove_listener(&mut self, id: ListenerId) -> bool;
    fn listener_count(&self) -> usize;

    fn text_len(&self, node: NodeId) -> usize {
        grapheme_len(&self.text_content(node))
    }

    fn last_element_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).last().copied()
    }

    fn first_element_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).first().copied()
    }

    fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let idx = siblings.iter().position(|&n| n == node)?;
        idx.checked_sub(1).map(|i| siblings[i])
    }
}
