//! Event pipelines applied to an `EditorSession`.
//!
//! Decomposed by concern:
//! * `modifier`   - command / shift tracking across key-down and key-up
//! * `command`    - chord resolution and invocation
//! * `guard`      - content length cap
//! * `structural` - Enter and Backspace/Delete auto-structuring
//! * `paste`      - plain-text and rich paste flows
//! * `focus`      - caret-holding element tracking after key-up
//!
//! Each stage returns a `DispatchResult`; the first stage reporting `stop` ends the key-down
//! pipeline and its disposition is what the host applies to the native event.

use core_document::Document;
use core_events::{EventDisposition, KEYDOWN_TOTAL, KeyEvent, key};
use std::sync::atomic::Ordering;
use tracing::trace;

use crate::{DispatchError, EditorSession};

pub(crate) mod command;
pub(crate) mod focus;
pub(crate) mod guard;
pub(crate) mod modifier;
pub(crate) mod paste;
pub(crate) mod structural;

pub use modifier::is_command;
pub use structural::StructuralKind;

/// Outcome of one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchResult {
    pub disposition: EventDisposition,
    /// No later stage runs.
    pub stop: bool,
}

impl DispatchResult {
    /// Nothing to apply; later stages run.
    pub fn proceed() -> Self {
        Self {
            disposition: EventDisposition::pass_through(),
            stop: false,
        }
    }
    /// End the pipeline without touching the native event.
    pub fn stop() -> Self {
        Self {
            disposition: EventDisposition::pass_through(),
            stop: true,
        }
    }
    /// Prevent the native action and end the pipeline.
    pub fn veto() -> Self {
        Self {
            disposition: EventDisposition::prevent(),
            stop: true,
        }
    }
    /// Prevent the native action, stop propagation, end the pipeline.
    pub fn halt() -> Self {
        Self {
            disposition: EventDisposition::halt(),
            stop: true,
        }
    }
}

pub(crate) fn key_down<D: Document>(
    session: &mut EditorSession<D>,
    event: &KeyEvent,
) -> Result<EventDisposition, DispatchError> {
    KEYDOWN_TOTAL.fetch_add(1, Ordering::Relaxed);
    if event.code == key::IME_PROCESS {
        trace!(target: "actions.modifier", "ime_composition_ignored");
        return Ok(EventDisposition::pass_through());
    }

    modifier::on_key_down(&mut session.cache, event, session.settings.modifier);

    let result = command::resolve(session, event)?;
    if result.stop {
        return Ok(result.disposition);
    }

    let result = guard::check(session, event);
    if result.stop {
        return Ok(result.disposition);
    }

    let result = match event.code {
        key::ENTER => structural::on_enter(session),
        key::BACKSPACE | key::DELETE => structural::on_backspace_or_delete(session, event),
        _ => DispatchResult::proceed(),
    };
    Ok(result.disposition)
}

pub(crate) fn key_up<D: Document>(session: &mut EditorSession<D>, event: &KeyEvent) {
    modifier::on_key_up(&mut session.cache, event, session.settings.modifier);
    session.run_upkeep();
    focus::track(session);

    if let Some(node) = session.cache.focused_element
        && let Some(hook) = session.hooks.key_context.get_mut(&event.code)
    {
        trace!(target: "actions.focus", code = event.code, node = node.0, "key_context");
        hook(event, node, &mut session.document);
    }
}

pub(crate) fn on_focus<D: Document>(session: &mut EditorSession<D>) {
    session.focus.activate(session.id);
    trace!(target: "actions.lifecycle", session = %session.id, "focus");
    session.refresh_placeholders();
}

pub(crate) fn on_blur<D: Document>(session: &mut EditorSession<D>) {
    let released = session.focus.release(session.id);
    trace!(target: "actions.lifecycle", session = %session.id, released, "blur");
    session.refresh_placeholders();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_constructors() {
        assert!(!DispatchResult::proceed().stop);
        assert!(DispatchResult::proceed().disposition.is_empty());
        assert!(DispatchResult::stop().stop);
        assert!(DispatchResult::stop().disposition.is_empty());
        assert!(DispatchResult::veto().disposition.default_prevented());
        assert!(!DispatchResult::veto().disposition.propagation_stopped());
        assert!(DispatchResult::halt().disposition.propagation_stopped());
    }
}
