//! Enter and Backspace/Delete auto-structuring over the root's element children.

use core_config::{Mode, Tags};
use core_document::{Document, NodeId};
use core_events::KeyEvent;
use tracing::debug;

use super::DispatchResult;
use crate::EditorSession;

/// Classification of a root child by tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralKind {
    Paragraph,
    HorizontalRule,
    Other,
}

impl StructuralKind {
    pub fn classify(tag: Option<&str>, tags: &Tags) -> Self {
        match tag {
            Some(t) if t.eq_ignore_ascii_case(&tags.paragraph) => Self::Paragraph,
            Some(t)
                if tags
                    .horizontal_rule
                    .as_deref()
                    .is_some_and(|hr| t.eq_ignore_ascii_case(hr)) =>
            {
                Self::HorizontalRule
            }
            _ => Self::Other,
        }
    }

    pub fn of<D: Document + ?Sized>(doc: &D, node: NodeId, tags: &Tags) -> Self {
        Self::classify(doc.tag_name(node), tags)
    }
}

fn is_empty_paragraph<D: Document + ?Sized>(doc: &D, node: NodeId, tags: &Tags) -> bool {
    StructuralKind::of(doc, node, tags) == StructuralKind::Paragraph && doc.text_len(node) == 0
}

fn is_rule<D: Document + ?Sized>(doc: &D, node: Option<NodeId>, tags: &Tags) -> bool {
    node.is_some_and(|n| StructuralKind::of(doc, n, tags) == StructuralKind::HorizontalRule)
}

pub(crate) fn on_enter<D: Document>(session: &mut EditorSession<D>) -> DispatchResult {
    let settings = &session.settings;
    let doc = &mut session.document;
    // Inline modes leave Enter to the host.
    if !settings.mode.is_block() {
        return DispatchResult::proceed();
    }

    if session.cache.shift_held
        && let Some(br) = settings.tags.line_break.as_deref()
    {
        let inserted = doc.insert_tag_at_caret(br).is_some();
        debug!(target: "actions.structural", tag = br, inserted, "line_break");
        return DispatchResult::veto();
    }

    let Some(node) = doc.caret_context() else {
        return DispatchResult::proceed();
    };
    let root = doc.root();
    let is_last = doc.last_element_child(root) == Some(node);
    let is_first = doc.first_element_child(root) == Some(node);
    let Some(hr) = settings.tags.horizontal_rule.as_deref() else {
        return DispatchResult::proceed();
    };
    if !is_last || is_first || !settings.auto_hr || settings.mode == Mode::Partial {
        return DispatchResult::proceed();
    }

    let make_rule = is_empty_paragraph(&*doc, node, &settings.tags)
        && !is_rule(&*doc, doc.previous_element_sibling(node), &settings.tags);

    let mut reference = node;
    if make_rule {
        reference = doc.insert_element_after(node, hr);
    }
    let paragraph = doc.insert_element_after(reference, &settings.tags.paragraph);
    doc.set_caret(paragraph, 0);
    debug!(target: "actions.structural", make_rule, "enter_new_paragraph");
    DispatchResult::veto()
}

pub(crate) fn on_backspace_or_delete<D: Document>(
    session: &mut EditorSession<D>,
    event: &KeyEvent,
) -> DispatchResult {
    if let Some(hook) = session.hooks.on_backspace_or_delete.as_mut()
        && hook(event, &mut session.document)
    {
        debug!(target: "actions.structural", code = event.code, "deletion_overridden");
        return DispatchResult::stop();
    }

    let tags = &session.settings.tags;
    let doc = &mut session.document;
    let Some(last) = doc.last_element_child(doc.root()) else {
        return DispatchResult::stop();
    };
    let before = doc.previous_element_sibling(last);

    if is_rule(&*doc, Some(last), tags) {
        doc.remove_node(last);
        debug!(target: "actions.structural", "trailing_rule_removed");
    } else if let Some(before) = before
        && is_empty_paragraph(&*doc, last, tags)
        && is_rule(&*doc, Some(before), tags)
    {
        doc.remove_node(last);
        doc.remove_node(before);
        debug!(target: "actions.structural", "rule_and_empty_paragraph_removed");
    }
    DispatchResult::proceed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_configured_tags() {
        let tags = Tags::default();
        assert_eq!(StructuralKind::classify(Some("p"), &tags), StructuralKind::Paragraph);
        assert_eq!(StructuralKind::classify(Some("HR"), &tags), StructuralKind::HorizontalRule);
        assert_eq!(StructuralKind::classify(Some("div"), &tags), StructuralKind::Other);
        assert_eq!(StructuralKind::classify(None, &tags), StructuralKind::Other);
    }

    #[test]
    fn missing_rule_tag_classifies_nothing_as_rule() {
        let tags = Tags {
            horizontal_rule: None,
            ..Tags::default()
        };
        assert_eq!(StructuralKind::classify(Some("hr"), &tags), StructuralKind::Other);
    }
}
