//! Records which element holds the caret after each key-up.

use core_document::Document;
use tracing::trace;

use crate::EditorSession;

pub(crate) fn track<D: Document>(session: &mut EditorSession<D>) {
    let doc = &session.document;
    let anchor = if doc.has_selection_api() {
        doc.anchor_node()
    } else {
        doc.active_element()
    };
    let Some(anchor) = anchor else {
        return;
    };

    let root = doc.root();
    // Caret directly in the root (empty root or caret on a child boundary): the anchor is the target.
    let target = match doc.parent(anchor) {
        Some(parent) if parent != root => parent,
        _ => anchor,
    };
    if session.cache.focused_element == Some(target) {
        return;
    }
    let index = doc
        .children(root)
        .iter()
        .position(|&c| c == target)
        .unwrap_or(0);
    session.cache.focused_element = Some(target);
    session.cache.focused_element_index = index;
    trace!(target: "actions.focus", node = target.0, index, "focused_element_changed");
}
