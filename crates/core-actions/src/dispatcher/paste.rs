//! Paste coordination.
//!
//! Plain-text mode prevents the native paste and asks the `TextPrompt` for text; the answer comes
//! back as `Event::PasteText`. Rich mode lets the native paste run and schedules a settle task
//! that posts `Event::PasteSettled`. Every paste gets its own ticket, and a plain-text ticket owns
//! the selection captured when the paste fired, so overlapping pastes never share state.
//!
//! Logs carry lengths only, never clipboard content.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use core_config::Mode;
use core_document::{Document, SelectionSnapshot, encode_html, grapheme_len, truncate_encoded};
use core_events::{EventDisposition, PASTE_BYTES, PASTE_SESSIONS, PasteTicket};
use tracing::{debug, trace};

use crate::EditorSession;

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

fn next_ticket() -> PasteTicket {
    PasteTicket(NEXT_TICKET.fetch_add(1, Ordering::Relaxed))
}

/// In-flight pastes of one session.
#[derive(Debug, Default)]
pub(crate) struct PasteState {
    awaiting_text: HashMap<PasteTicket, SelectionSnapshot>,
    settling: HashSet<PasteTicket>,
}

impl PasteState {
    pub(crate) fn in_flight(&self) -> usize {
        self.awaiting_text.len() + self.settling.len()
    }
}

pub(crate) fn on_paste<D: Document>(
    session: &mut EditorSession<D>,
    state: &mut PasteState,
) -> EventDisposition {
    session.journal.checkpoint(&session.document);
    PASTE_SESSIONS.fetch_add(1, Ordering::Relaxed);
    let ticket = next_ticket();

    if session.settings.paste_as_text {
        let snapshot = session.document.save_selection();
        state.awaiting_text.insert(ticket, snapshot);
        debug!(target: "actions.paste", %ticket, pending = state.awaiting_text.len(), "plain_text_requested");
        session.prompt.request_plain_text(ticket);
        EventDisposition::prevent()
    } else {
        state.settling.insert(ticket);
        let delay = Duration::from_millis(session.settings.paste_settle_ms);
        session.scheduler.schedule(ticket, delay);
        debug!(target: "actions.paste", %ticket, delay_ms = session.settings.paste_settle_ms, "rich_paste_settling");
        EventDisposition::pass_through()
    }
}

/// Plain text arrived for `ticket`.
pub(crate) fn complete<D: Document>(
    session: &mut EditorSession<D>,
    state: &mut PasteState,
    ticket: PasteTicket,
    text: Option<&str>,
) {
    let Some(snapshot) = state.awaiting_text.remove(&ticket) else {
        trace!(target: "actions.paste", %ticket, "stale_ticket");
        return;
    };
    let text = text.unwrap_or_default();
    if text.is_empty() {
        debug!(target: "actions.paste", %ticket, "empty_clipboard");
        return;
    }

    session.document.focus();
    session.focus.activate(session.id);
    session.document.restore_selection(&snapshot);

    let mut html = encode_html(text);
    let mut truncated = false;
    if let Some(cap) = session.settings.length_cap()
        && cap > 0
    {
        let existing = session.document.text_len(session.document.root());
        if grapheme_len(&html) + existing > cap {
            html = truncate_encoded(&html, cap.saturating_sub(existing));
            truncated = true;
        }
    }
    if html.is_empty() {
        debug!(target: "actions.paste", %ticket, truncated, "nothing_left_to_insert");
        return;
    }
    if session.settings.mode != Mode::Inline {
        let br = session.settings.tags.line_break.as_deref().unwrap_or("br");
        html = html.replace('\n', &format!("<{br}>"));
    }

    if let Some(hook) = session.hooks.before_insert_html.as_mut() {
        hook(&mut session.document);
    }
    session.journal.note_insert(&session.document, false);
    session.document.insert_html_at_caret(&html);
    PASTE_BYTES.fetch_add(html.len() as u64, Ordering::Relaxed);
    debug!(target: "actions.paste", %ticket, text_len = grapheme_len(text), inserted_bytes = html.len(), truncated, "plain_text_inserted");

    session.run_upkeep();
}

/// The settle delay for a rich paste elapsed.
pub(crate) fn settled<D: Document>(
    session: &mut EditorSession<D>,
    state: &mut PasteState,
    ticket: PasteTicket,
) {
    if !state.settling.remove(&ticket) {
        trace!(target: "actions.paste", %ticket, "stale_settle");
        return;
    }
    session.run_upkeep();
    debug!(target: "actions.paste", %ticket, "rich_paste_settled");
}

/// Drop every pending paste and cancel scheduled settle tasks. Returns `(dropped, cancelled)`.
pub(crate) fn abandon_all<D: Document>(
    session: &mut EditorSession<D>,
    state: &mut PasteState,
) -> (usize, usize) {
    let dropped = state.in_flight();
    state.awaiting_text.clear();
    state.settling.clear();
    let cancelled = session.scheduler.cancel_all();
    (dropped, cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FocusRegistry;
    use core_config::Settings;
    use core_document::MemoryDocument;

    fn session(html: &str, settings: Settings) -> EditorSession<MemoryDocument> {
        EditorSession::new(MemoryDocument::from_html(html), settings, FocusRegistry::new())
    }

    fn caret_at_end(s: &mut EditorSession<MemoryDocument>) {
        let p = s.document.child(0).unwrap();
        let len = s.document.child_nodes(p).len();
        s.document.set_caret(p, len);
    }

    #[test]
    fn tickets_are_unique() {
        assert_ne!(next_ticket(), next_ticket());
    }

    #[test]
    fn plain_text_is_encoded_and_broken() {
        let mut s = session("<p></p>", Settings::default());
        caret_at_end(&mut s);
        let mut state = PasteState::default();
        let d = on_paste(&mut s, &mut state);
        assert!(d.default_prevented());
        let ticket = *state.awaiting_text.keys().next().unwrap();
        complete(&mut s, &mut state, ticket, Some("a<b>\nc"));
        assert_eq!(s.document.inner_html(), "<p>a&lt;b&gt;<br>c</p>");
        assert_eq!(state.in_flight(), 0);
        assert!(s.is_active());
    }

    #[test]
    fn inline_mode_keeps_newlines() {
        let settings = Settings {
            mode: Mode::Inline,
            ..Settings::default()
        };
        let mut s = session("<p></p>", settings);
        caret_at_end(&mut s);
        let mut state = PasteState::default();
        on_paste(&mut s, &mut state);
        let ticket = *state.awaiting_text.keys().next().unwrap();
        complete(&mut s, &mut state, ticket, Some("a\nb"));
        assert_eq!(s.document.text_content(s.document.root()), "a\nb");
    }

    #[test]
    fn empty_text_inserts_nothing() {
        let mut s = session("<p>x</p>", Settings::default());
        caret_at_end(&mut s);
        let mut state = PasteState::default();
        on_paste(&mut s, &mut state);
        let ticket = *state.awaiting_text.keys().next().unwrap();
        complete(&mut s, &mut state, ticket, None);
        assert_eq!(s.document.inner_html(), "<p>x</p>");
        assert_eq!(state.in_flight(), 0);
        assert!(!s.is_active());
    }

    #[test]
    fn unknown_ticket_is_ignored() {
        let mut s = session("<p>x</p>", Settings::default());
        let mut state = PasteState::default();
        complete(&mut s, &mut state, PasteTicket(u64::MAX), Some("zzz"));
        settled(&mut s, &mut state, PasteTicket(u64::MAX));
        assert_eq!(s.document.inner_html(), "<p>x</p>");
    }

    #[test]
    fn rich_paste_passes_through_and_tracks_ticket() {
        let settings = Settings {
            paste_as_text: false,
            ..Settings::default()
        };
        let mut s = session("<p>x</p>", settings);
        let mut state = PasteState::default();
        let d = on_paste(&mut s, &mut state);
        assert!(d.is_empty());
        assert_eq!(state.in_flight(), 1);
        let ticket = *state.settling.iter().next().unwrap();
        settled(&mut s, &mut state, ticket);
        assert_eq!(state.in_flight(), 0);
    }

    #[test]
    fn abandon_clears_everything() {
        let mut s = session("<p></p>", Settings::default());
        let mut state = PasteState::default();
        on_paste(&mut s, &mut state);
        on_paste(&mut s, &mut state);
        assert_eq!(abandon_all(&mut s, &mut state), (2, 0));
        assert_eq!(state.in_flight(), 0);
    }
}
