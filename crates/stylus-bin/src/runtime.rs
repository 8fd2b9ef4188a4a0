//! Event loop driving one `Action` over a `MemoryDocument`.
//!
//! Native events come from the script source; paste answers and settle notifications come back
//! through the same channel. The loop stops after `Event::Shutdown` once no paste is in flight,
//! or when the drain window elapses.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use core_actions::{Action, Command, CommandOutcome, EditorSession, FocusRegistry, PASTE_COMMAND, TextPrompt};
use core_config::Settings;
use core_document::{Document, MemoryDocument, encode_html};
use core_events::{
    CHORDS_DISPATCHED, CHORDS_SUPPRESSED, Event, InputEvent, KEYDOWN_TOTAL, LENGTH_VETOES,
    PASTE_BYTES, PASTE_SESSIONS, PasteTicket, TokioSettleScheduler, key,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::script::Cue;

/// How long the loop waits for in-flight pastes after shutdown was requested.
const DRAIN_WINDOW: Duration = Duration::from_millis(500);

type Answers = Rc<RefCell<VecDeque<Option<String>>>>;

/// Answers plain-text requests with the clipboard text of the paste that triggered them.
struct ScriptPrompt {
    answers: Answers,
    tx: mpsc::Sender<Event>,
}

impl TextPrompt for ScriptPrompt {
    fn request_plain_text(&mut self, ticket: PasteTicket) {
        let text = self.answers.borrow_mut().pop_front().flatten();
        if let Err(err) = self.tx.try_send(Event::PasteText { ticket, text }) {
            warn!(target: "runtime", %ticket, %err, "prompt_answer_dropped");
        }
    }
}

/// Undo/redo on Z/Y unless the configuration binds those keys, plus a logging stub for every
/// configured command name.
pub fn install_commands(session: &mut EditorSession<MemoryDocument>) {
    if session.command_table().get(key::Z).is_none() {
        session.bind(
            key::Z,
            Command::direct(|s: &mut EditorSession<MemoryDocument>, _| {
                let undone = s.undo();
                info!(target: "runtime", undone, "undo");
                CommandOutcome::Halt
            }),
        );
    }
    if session.command_table().get(key::Y).is_none() {
        session.bind(
            key::Y,
            Command::direct(|s: &mut EditorSession<MemoryDocument>, _| {
                let redone = s.redo();
                info!(target: "runtime", redone, "redo");
                CommandOutcome::Halt
            }),
        );
    }

    let names: BTreeSet<String> = session
        .settings()
        .commands
        .iter()
        .map(|b| b.command.clone())
        .collect();
    for name in names {
        let outcome = if name == PASTE_COMMAND {
            CommandOutcome::Continue
        } else {
            CommandOutcome::Halt
        };
        let label = name.clone();
        session.register_command(name, move |_, event| {
            info!(target: "runtime", command = %label, code = event.code, "command");
            outcome
        });
    }
}

pub struct Runtime {
    action: Action<MemoryDocument>,
    cues: VecDeque<Cue>,
    answers: Answers,
    rx: mpsc::Receiver<Event>,
}

impl Runtime {
    pub fn new(
        settings: Settings,
        html: &str,
        cues: Vec<Cue>,
        tx: mpsc::Sender<Event>,
        rx: mpsc::Receiver<Event>,
    ) -> Result<Self> {
        let answers: Answers = Rc::default();
        let prompt = ScriptPrompt {
            answers: answers.clone(),
            tx: tx.clone(),
        };
        let mut session =
            EditorSession::new(MemoryDocument::from_html(html), settings, FocusRegistry::new())
                .with_prompt(prompt)
                .with_scheduler(TokioSettleScheduler::new(tx));
        install_commands(&mut session);
        let mut action = Action::new(session);
        action.setup()?;
        Ok(Self {
            action,
            cues: cues.into(),
            answers,
            rx,
        })
    }

    /// Run until shutdown and return the final markup.
    pub async fn run(mut self) -> Result<String> {
        let mut draining = false;
        loop {
            if draining && self.action.pending_pastes() == 0 {
                break;
            }
            let next = if draining {
                match tokio::time::timeout(DRAIN_WINDOW, self.rx.recv()).await {
                    Ok(ev) => ev,
                    Err(_) => {
                        warn!(target: "runtime", pending = self.action.pending_pastes(), "drain_timeout");
                        break;
                    }
                }
            } else {
                self.rx.recv().await
            };
            let Some(event) = next else {
                break;
            };
            match event {
                Event::Shutdown => {
                    debug!(target: "runtime", pending = self.action.pending_pastes(), "shutdown_requested");
                    draining = true;
                }
                Event::Input(input) => self.apply_input(input)?,
                other => {
                    self.action.handle(&other)?;
                }
            }
        }

        let markup = self.action.document().inner_html();
        self.action.destroy();
        info!(
            target: "runtime",
            keydown = KEYDOWN_TOTAL.load(Ordering::Relaxed),
            chords_dispatched = CHORDS_DISPATCHED.load(Ordering::Relaxed),
            chords_suppressed = CHORDS_SUPPRESSED.load(Ordering::Relaxed),
            length_vetoes = LENGTH_VETOES.load(Ordering::Relaxed),
            paste_sessions = PASTE_SESSIONS.load(Ordering::Relaxed),
            paste_bytes = PASTE_BYTES.load(Ordering::Relaxed),
            "shutdown"
        );
        Ok(markup)
    }

    fn apply_input(&mut self, input: InputEvent) -> Result<()> {
        let cue = self.cues.pop_front();
        let (caret, text) = match cue {
            Some(cue) if cue.input == input => (cue.caret, cue.text),
            Some(cue) => {
                warn!(target: "runtime", expected = ?cue.input, got = ?input, "cue_mismatch");
                (None, None)
            }
            None => (None, None),
        };

        if let Some([child, offset]) = caret {
            let doc = self.action.document_mut();
            match doc.child(child) {
                Some(node) => doc.set_caret(node, offset),
                None => warn!(target: "runtime", child, "caret_child_missing"),
            }
        }

        let plain_paste = input == InputEvent::Paste && self.action.session().settings().paste_as_text;
        if plain_paste {
            self.answers.borrow_mut().push_back(text.clone());
        }

        let disposition = self.action.handle(&Event::Input(input))?;
        if disposition.default_prevented() {
            return Ok(());
        }
        // Stand in for the native default action.
        match (input, text) {
            (InputEvent::KeyDown(_), Some(typed)) => {
                self.action.document_mut().insert_html_at_caret(&encode_html(&typed));
            }
            (InputEvent::Paste, Some(rich)) if !plain_paste => {
                self.action.document_mut().insert_html_at_caret(&rich);
            }
            _ => {}
        }
        Ok(())
    }
}
