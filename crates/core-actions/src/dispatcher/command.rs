//! Chord resolution.
//!
//! A chord is a key-down with the command modifier held and a key present in the command table.
//! Restricted modes let only the paste command through; everything else is swallowed. A command
//! that lets the keystroke continue hands it on to the length guard and structural stages.

use core_document::Document;
use core_events::{CHORDS_DISPATCHED, CHORDS_SUPPRESSED, KeyEvent};
use std::sync::atomic::Ordering;
use tracing::{debug, trace};

use super::DispatchResult;
use crate::{DispatchError, EditorSession};

pub(crate) fn resolve<D: Document>(
    session: &mut EditorSession<D>,
    event: &KeyEvent,
) -> Result<DispatchResult, DispatchError> {
    if !session.cache.command_held {
        return Ok(DispatchResult::proceed());
    }
    let Some(command) = session.table.get(event.code).cloned() else {
        trace!(target: "actions.command", code = event.code, "unbound_chord");
        return Ok(DispatchResult::proceed());
    };

    if session.settings.mode.restricts_commands() && !command.is_paste() {
        CHORDS_SUPPRESSED.fetch_add(1, Ordering::Relaxed);
        debug!(target: "actions.command", code = event.code, command = command.label(), mode = ?session.settings.mode, "chord_suppressed");
        return Ok(DispatchResult::veto());
    }

    let callable = session.resolve(&command)?;
    let outcome = callable(session, event);
    CHORDS_DISPATCHED.fetch_add(1, Ordering::Relaxed);
    debug!(target: "actions.command", code = event.code, command = command.label(), ?outcome, "chord_dispatched");

    Ok(if outcome.suppresses() {
        DispatchResult::halt()
    } else {
        DispatchResult::proceed()
    })
}
