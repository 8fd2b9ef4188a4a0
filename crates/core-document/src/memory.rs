//! Arena-backed `Document` used by tests and the `stylus` binary.

use std::collections::BTreeMap;

use core_events::{EventKind, ListenerId};
use unicode_segmentation::UnicodeSegmentation;

use crate::html::{Token, encode_html, grapheme_byte_index, grapheme_len, is_void, tokenize};
use crate::{Document, NodeId, Position, SelectionRange, SelectionSnapshot};

#[derive(Debug, Clone)]
enum NodeKind {
    Element(String),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// In-memory element tree with a single selection and an event-target listener table.
///
/// Removed nodes stay in the arena detached, so stale `NodeId`s never alias a new node.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<Node>,
    root: NodeId,
    selection: Option<SelectionRange>,
    active: Option<NodeId>,
    selection_api: bool,
    listeners: BTreeMap<ListenerId, EventKind>,
    next_listener: u64,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element("div".to_string()),
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            selection: None,
            active: None,
            selection_api: true,
            listeners: BTreeMap::new(),
            next_listener: 1,
        }
    }

    pub fn from_html(html: &str) -> Self {
        let mut doc = Self::new();
        doc.set_inner_html(html);
        doc
    }

    /// `i`-th element child of the root.
    pub fn child(&self, i: usize) -> Option<NodeId> {
        self.children(self.root).get(i).copied()
    }

    /// All children of `node`, text nodes included.
    pub fn child_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn set_selection(&mut self, anchor: Position, focus: Position) {
        self.selection = Some(SelectionRange {
            anchor: self.clamp(anchor),
            focus: self.clamp(focus),
        });
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn selection(&self) -> Option<SelectionRange> {
        self.selection
    }

    /// Simulate a host without a selection API; caret lookups fall back to the active element.
    pub fn set_selection_api(&mut self, available: bool) {
        self.selection_api = available;
    }

    pub fn set_active_element(&mut self, node: Option<NodeId>) {
        self.active = node;
    }

    pub fn blur(&mut self) {
        self.active = None;
    }

    pub fn is_focused(&self) -> bool {
        self.active.is_some()
    }

    pub fn caret(&self) -> Option<Position> {
        self.selection.map(|s| s.focus)
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut cur = node;
        loop {
            if cur == self.root {
                return true;
            }
            match self.nodes.get(cur.0).and_then(|n| n.parent) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    // ------------------------------------------------------------------
    // arena helpers
    // ------------------------------------------------------------------

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let siblings = &mut self.nodes[parent.0].children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    fn index_in_parent(&self, node: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.nodes.get(node.0)?.parent?;
        let idx = self.nodes[parent.0].children.iter().position(|&c| c == node)?;
        Some((parent, idx))
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.nodes.get(n.0).and_then(|n| n.parent);
        }
        false
    }

    fn clamp(&self, pos: Position) -> Position {
        let max = match self.nodes.get(pos.node.0).map(|n| &n.kind) {
            Some(NodeKind::Text(t)) => grapheme_len(t),
            Some(NodeKind::Element(_)) => self.nodes[pos.node.0].children.len(),
            None => 0,
        };
        Position::new(pos.node, pos.offset.min(max))
    }

    /// Resolve the caret to a (parent element, child index) insertion point, splitting a text
    /// node when the caret sits inside one.
    fn insertion_point(&mut self, pos: Position) -> Option<(NodeId, usize)> {
        let pos = self.clamp(pos);
        let text = match &self.nodes[pos.node.0].kind {
            NodeKind::Element(_) => return Some((pos.node, pos.offset)),
            NodeKind::Text(t) => t.clone(),
        };
        let (parent, idx) = self.index_in_parent(pos.node)?;
        let len = grapheme_len(&text);
        if pos.offset == 0 {
            return Some((parent, idx));
        }
        if pos.offset >= len {
            return Some((parent, idx + 1));
        }
        let split = grapheme_byte_index(&text, pos.offset);
        let (head, tail) = text.split_at(split);
        self.nodes[pos.node.0].kind = NodeKind::Text(head.to_string());
        let tail_node = self.alloc(NodeKind::Text(tail.to_string()));
        self.insert_child(parent, idx + 1, tail_node);
        Some((parent, idx + 1))
    }

    /// Remove the selected graphemes when both ends sit in the same text node; otherwise
    /// collapse to the focus end.
    fn delete_selection(&mut self) -> Option<Position> {
        let sel = self.selection?;
        if sel.is_collapsed() || sel.anchor.node != sel.focus.node {
            return Some(sel.focus);
        }
        let node = sel.anchor.node;
        let NodeKind::Text(text) = &self.nodes[node.0].kind else {
            return Some(sel.focus);
        };
        let (lo, hi) = if sel.anchor.offset <= sel.focus.offset {
            (sel.anchor.offset, sel.focus.offset)
        } else {
            (sel.focus.offset, sel.anchor.offset)
        };
        let kept: String = text
            .graphemes(true)
            .enumerate()
            .filter(|(i, _)| *i < lo || *i >= hi)
            .map(|(_, g)| g)
            .collect();
        self.nodes[node.0].kind = NodeKind::Text(kept);
        Some(Position::new(node, lo))
    }

    fn build_into(&mut self, parent: NodeId, index: usize, html: &str) -> usize {
        let mut stack = vec![parent];
        let mut cursor = index;
        let mut top_level = 0usize;
        for token in tokenize(html) {
            let current = stack.last().copied().unwrap_or(parent);
            let at = if current == parent { cursor } else { usize::MAX };
            match token {
                Token::Text(t) if t.is_empty() => continue,
                Token::Text(t) => {
                    let id = self.alloc(NodeKind::Text(t));
                    self.insert_child(current, at, id);
                }
                Token::Open { tag, void } => {
                    let id = self.alloc(NodeKind::Element(tag));
                    self.insert_child(current, at, id);
                    if !void {
                        stack.push(id);
                    }
                }
                Token::Close(tag) => {
                    // pop to the nearest matching open element; stray closers are dropped
                    if let Some(depth) = stack[1..]
                        .iter()
                        .rposition(|&n| self.tag_name(n) == Some(tag.as_str()))
                    {
                        stack.truncate(depth + 1);
                    }
                    continue;
                }
            }
            if current == parent {
                cursor += 1;
                top_level += 1;
            }
        }
        top_level
    }

    fn serialize(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Text(t) => out.push_str(&encode_html(t)),
            NodeKind::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                out.push('>');
                if is_void(tag) {
                    return;
                }
                for &c in &self.nodes[node.0].children {
                    self.serialize(c, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element(_) => {
                for &c in &self.nodes[node.0].children {
                    self.collect_text(c, out);
                }
            }
        }
    }
}

impl Document for MemoryDocument {
    fn root(&self) -> NodeId {
        self.root
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|c| matches!(self.nodes[c.0].kind, NodeKind::Element(_)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element(tag) => Some(tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        if node.0 < self.nodes.len() {
            self.collect_text(node, &mut out);
        }
        out
    }

    fn inner_html(&self) -> String {
        let mut out = String::new();
        for &c in &self.nodes[self.root.0].children {
            self.serialize(c, &mut out);
        }
        out
    }

    fn set_inner_html(&mut self, html: &str) {
        let old = std::mem::take(&mut self.nodes[self.root.0].children);
        for c in old {
            self.nodes[c.0].parent = None;
        }
        let root = self.root;
        self.build_into(root, 0, html);
        self.selection = None;
    }

    fn insert_element_after(&mut self, reference: NodeId, tag: &str) -> NodeId {
        let id = self.alloc(NodeKind::Element(tag.to_string()));
        match self.index_in_parent(reference) {
            Some((parent, idx)) => self.insert_child(parent, idx + 1, id),
            None => {
                let root = self.root;
                self.insert_child(root, usize::MAX, id);
            }
        }
        id
    }

    fn remove_node(&mut self, node: NodeId) {
        if node == self.root || node.0 >= self.nodes.len() {
            return;
        }
        if let Some(sel) = self.selection
            && (self.contains(node, sel.anchor.node) || self.contains(node, sel.focus.node))
        {
            self.selection = None;
        }
        if self.active.is_some_and(|a| self.contains(node, a)) {
            self.active = Some(self.root);
        }
        self.detach(node);
    }

    fn insert_tag_at_caret(&mut self, tag: &str) -> Option<NodeId> {
        let caret = self.delete_selection()?;
        let (parent, idx) = self.insertion_point(caret)?;
        let id = self.alloc(NodeKind::Element(tag.to_string()));
        self.insert_child(parent, idx, id);
        self.selection = Some(SelectionRange::collapsed(Position::new(parent, idx + 1)));
        Some(id)
    }

    fn insert_html_at_caret(&mut self, html: &str) {
        let Some(caret) = self.delete_selection() else {
            return;
        };
        let Some((parent, idx)) = self.insertion_point(caret) else {
            return;
        };
        let added = self.build_into(parent, idx, html);
        self.selection = Some(SelectionRange::collapsed(Position::new(parent, idx + added)));
    }

    fn set_caret(&mut self, node: NodeId, offset: usize) {
        self.selection = Some(SelectionRange::collapsed(
            self.clamp(Position::new(node, offset)),
        ));
    }

    fn caret_context(&self) -> Option<NodeId> {
        let mut cur = self.selection?.anchor.node;
        loop {
            let parent = self.parent(cur)?;
            if parent == self.root {
                return Some(cur);
            }
            cur = parent;
        }
    }

    fn anchor_node(&self) -> Option<NodeId> {
        if !self.selection_api {
            return None;
        }
        self.selection.map(|s| s.anchor.node)
    }

    fn active_element(&self) -> Option<NodeId> {
        self.active
    }

    fn has_selection_api(&self) -> bool {
        self.selection_api
    }

    fn is_selection_collapsed(&self) -> bool {
        self.selection.is_none_or(|s| s.is_collapsed())
    }

    fn save_selection(&self) -> SelectionSnapshot {
        SelectionSnapshot::new(self.selection)
    }

    fn restore_selection(&mut self, snapshot: &SelectionSnapshot) {
        self.selection = snapshot.range().filter(|r| {
            self.is_attached(r.anchor.node) && self.is_attached(r.focus.node)
        });
    }

    fn focus(&mut self) {
        if self.active.is_none() {
            self.active = Some(self.root);
        }
    }

    fn add_listener(&mut self, kind: EventKind) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.insert(id, kind);
        id
    }

    fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
