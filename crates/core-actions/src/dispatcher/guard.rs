//! Content length cap.
//!
//! Exemptions are checked before the length so navigation and selection keep working at the
//! cap.

use core_document::Document;
use core_events::{KeyEvent, LENGTH_VETOES, is_navigational, is_special};
use std::sync::atomic::Ordering;
use tracing::{debug, trace};

use super::DispatchResult;
use crate::EditorSession;

pub(crate) fn check<D: Document>(session: &mut EditorSession<D>, event: &KeyEvent) -> DispatchResult {
    let Some(cap) = session.settings.length_cap() else {
        return DispatchResult::proceed();
    };
    if is_special(event) || is_navigational(event) {
        trace!(target: "actions.guard", code = event.code, "exempt_key");
        return DispatchResult::proceed();
    }
    if !session.document.is_selection_collapsed() {
        trace!(target: "actions.guard", code = event.code, "exempt_selection");
        return DispatchResult::proceed();
    }

    let len = session.document.text_len(session.document.root());
    if len < cap {
        return DispatchResult::proceed();
    }

    if let Some(hook) = session.hooks.max_length_reached.as_mut() {
        hook(&session.document);
    }
    LENGTH_VETOES.fetch_add(1, Ordering::Relaxed);
    debug!(target: "actions.guard", code = event.code, len, cap, "length_veto");
    DispatchResult::veto()
}
