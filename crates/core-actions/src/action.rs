//! The per-editor orchestrator: listener lifecycle and event routing.

use core_document::Document;
use core_events::{Event, EventDisposition, EventKind, InputEvent, ListenerId};
use tracing::{debug, info, trace};

use crate::dispatcher::{self, paste::PasteState};
use crate::{DispatchError, EditorSession};

/// Listener handles attached to a document, released in attach order.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    attached: Vec<(EventKind, ListenerId)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach one listener per kind in `EventKind::ALL` order, skipping kinds already attached.
    /// Returns how many were added.
    pub fn attach<D: Document + ?Sized>(&mut self, doc: &mut D) -> usize {
        let mut added = 0;
        for kind in EventKind::ALL {
            if self.is_attached(kind) {
                continue;
            }
            let id = doc.add_listener(kind);
            self.attached.push((kind, id));
            added += 1;
        }
        added
    }

    /// Remove every listener in attach order. Returns how many the document still held.
    pub fn detach<D: Document + ?Sized>(&mut self, doc: &mut D) -> usize {
        let mut removed = 0;
        for (kind, id) in self.attached.drain(..) {
            if doc.remove_listener(id) {
                removed += 1;
            } else {
                debug!(target: "actions.lifecycle", %kind, "listener_already_gone");
            }
        }
        removed
    }

    pub fn is_attached(&self, kind: EventKind) -> bool {
        self.attached.iter().any(|(k, _)| *k == kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.attached.iter().map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }
}

/// One editor's input handling. Owns the session; the host feeds it events.
pub struct Action<D: Document> {
    session: EditorSession<D>,
    listeners: ListenerRegistry,
    paste: PasteState,
    destroyed: bool,
}

impl<D: Document> Action<D> {
    pub fn new(session: EditorSession<D>) -> Self {
        Self {
            session,
            listeners: ListenerRegistry::new(),
            paste: PasteState::default(),
            destroyed: false,
        }
    }

    /// Check the command table and attach listeners for focus, blur, keydown, keyup, paste.
    pub fn setup(&mut self) -> Result<(), DispatchError> {
        if self.destroyed {
            debug!(target: "actions.lifecycle", session = %self.session.id, "setup_after_destroy_ignored");
            return Ok(());
        }
        self.session.validate_commands()?;
        let added = self.listeners.attach(&mut self.session.document);
        info!(target: "actions.lifecycle", session = %self.session.id, added, listeners = self.listeners.len(), "setup");
        Ok(())
    }

    /// Detach every listener, abandon in-flight pastes, and release focus if held. Terminal.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        let removed = self.listeners.detach(&mut self.session.document);
        let (dropped, cancelled) = dispatcher::paste::abandon_all(&mut self.session, &mut self.paste);
        let released = self.session.focus.release(self.session.id);
        self.destroyed = true;
        info!(target: "actions.lifecycle", session = %self.session.id, removed, dropped, cancelled, released, "destroy");
    }

    /// Route one event. Native events need an attached listener; paste completions do not.
    pub fn handle(&mut self, event: &Event) -> Result<EventDisposition, DispatchError> {
        if self.destroyed {
            trace!(target: "actions.lifecycle", "event_after_destroy");
            return Ok(EventDisposition::pass_through());
        }
        match event {
            Event::Input(input) => {
                if !self.listeners.is_attached(input.kind()) {
                    trace!(target: "actions.lifecycle", kind = %input.kind(), "no_listener");
                    return Ok(EventDisposition::pass_through());
                }
                self.handle_input(input)
            }
            Event::PasteText { ticket, text } => {
                dispatcher::paste::complete(
                    &mut self.session,
                    &mut self.paste,
                    *ticket,
                    text.as_deref(),
                );
                Ok(EventDisposition::pass_through())
            }
            Event::PasteSettled { ticket } => {
                dispatcher::paste::settled(&mut self.session, &mut self.paste, *ticket);
                Ok(EventDisposition::pass_through())
            }
            Event::Shutdown => Ok(EventDisposition::pass_through()),
        }
    }

    fn handle_input(&mut self, input: &InputEvent) -> Result<EventDisposition, DispatchError> {
        let session = &mut self.session;
        match input {
            InputEvent::Focus => {
                dispatcher::on_focus(session);
                Ok(EventDisposition::pass_through())
            }
            InputEvent::Blur => {
                dispatcher::on_blur(session);
                Ok(EventDisposition::pass_through())
            }
            InputEvent::KeyDown(key) => dispatcher::key_down(session, key),
            InputEvent::KeyUp(key) => {
                dispatcher::key_up(session, key);
                Ok(EventDisposition::pass_through())
            }
            InputEvent::Paste => Ok(dispatcher::paste::on_paste(session, &mut self.paste)),
        }
    }

    pub fn session(&self) -> &EditorSession<D> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditorSession<D> {
        &mut self.session
    }

    pub fn document(&self) -> &D {
        &self.session.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.session.document
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Pastes awaiting text or settling.
    pub fn pending_pastes(&self) -> usize {
        self.paste.in_flight()
    }

    pub fn into_session(self) -> EditorSession<D> {
        self.session
    }
}
