#![allow(dead_code)] // Shared across integration tests; each test binary uses a subset of helpers.

use core_actions::{
    Action, CommandOutcome, EditorSession, FocusRegistry, Hooks, TextPrompt, Upkeep,
};
use core_config::Settings;
use core_document::{Document, MemoryDocument};
use core_events::{Event, InputEvent, KeyEvent, KeyModifiers, PasteTicket, SettleScheduler};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

// -------------------------------------------------------------------------------------------------
// Recording collaborators
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct UpkeepLog {
    pub cleans: usize,
    /// `focused` flag of every placeholder refresh, in order.
    pub refreshes: Vec<bool>,
}

#[derive(Clone, Default)]
pub struct RecordingUpkeep(pub Rc<RefCell<UpkeepLog>>);

impl Upkeep<MemoryDocument> for RecordingUpkeep {
    fn clean(&mut self, _doc: &mut MemoryDocument) {
        self.0.borrow_mut().cleans += 1;
    }
    fn refresh_placeholders(&mut self, _doc: &MemoryDocument, focused: bool) {
        self.0.borrow_mut().refreshes.push(focused);
    }
}

#[derive(Clone, Default)]
pub struct RecordingPrompt(pub Rc<RefCell<Vec<PasteTicket>>>);

impl TextPrompt for RecordingPrompt {
    fn request_plain_text(&mut self, ticket: PasteTicket) {
        self.0.borrow_mut().push(ticket);
    }
}

#[derive(Debug, Default)]
pub struct SchedulerLog {
    pub scheduled: Vec<(PasteTicket, Duration)>,
    pub cancel_all_calls: usize,
    pub outstanding: usize,
}

#[derive(Clone, Default)]
pub struct RecordingScheduler(pub Rc<RefCell<SchedulerLog>>);

impl SettleScheduler for RecordingScheduler {
    fn schedule(&mut self, ticket: PasteTicket, delay: Duration) {
        let mut log = self.0.borrow_mut();
        log.scheduled.push((ticket, delay));
        log.outstanding += 1;
    }
    fn cancel(&mut self, _ticket: PasteTicket) -> bool {
        let mut log = self.0.borrow_mut();
        let had = log.outstanding > 0;
        log.outstanding = log.outstanding.saturating_sub(1);
        had
    }
    fn cancel_all(&mut self) -> usize {
        let mut log = self.0.borrow_mut();
        log.cancel_all_calls += 1;
        std::mem::take(&mut log.outstanding)
    }
}

// -------------------------------------------------------------------------------------------------
// Harness
// -------------------------------------------------------------------------------------------------

pub struct Editor {
    pub action: Action<MemoryDocument>,
    pub focus: FocusRegistry,
    pub upkeep: Rc<RefCell<UpkeepLog>>,
    pub prompts: Rc<RefCell<Vec<PasteTicket>>>,
    pub scheduler: Rc<RefCell<SchedulerLog>>,
}

/// Settings with every default command registered as a no-op.
pub fn editor(html: &str, settings: Settings) -> Editor {
    editor_with(html, settings, Hooks::default(), FocusRegistry::new())
}

pub fn editor_with(
    html: &str,
    settings: Settings,
    hooks: Hooks<MemoryDocument>,
    focus: FocusRegistry,
) -> Editor {
    let upkeep = RecordingUpkeep::default();
    let prompt = RecordingPrompt::default();
    let scheduler = RecordingScheduler::default();
    let names: Vec<String> = settings.commands.iter().map(|b| b.command.clone()).collect();
    let mut session = EditorSession::new(MemoryDocument::from_html(html), settings, focus.clone())
        .with_hooks(hooks)
        .with_upkeep(upkeep.clone())
        .with_prompt(prompt.clone())
        .with_scheduler(scheduler.clone());
    for name in names {
        session.register_command(name, |_, _| CommandOutcome::Halt);
    }
    let mut action = Action::new(session);
    action.setup().expect("setup");
    Editor {
        action,
        focus,
        upkeep: upkeep.0,
        prompts: prompt.0,
        scheduler: scheduler.0,
    }
}

impl Editor {
    pub fn doc(&self) -> &MemoryDocument {
        self.action.document()
    }
    pub fn doc_mut(&mut self) -> &mut MemoryDocument {
        self.action.document_mut()
    }
    pub fn html(&self) -> String {
        self.doc().inner_html()
    }
    pub fn text_len(&self) -> usize {
        self.doc().text_len(self.doc().root())
    }
    /// Place the caret inside the `i`-th root child at `offset`.
    pub fn caret_in(&mut self, i: usize, offset: usize) {
        let node = self.doc().child(i).expect("child");
        self.doc_mut().set_caret(node, offset);
    }
    /// Place the caret after the last node of the last root child.
    pub fn caret_at_end(&mut self) {
        let doc = self.doc();
        let last = doc.last_element_child(doc.root()).expect("last child");
        let len = doc.child_nodes(last).len();
        self.doc_mut().set_caret(last, len);
    }
    pub fn send(&mut self, event: Event) -> core_events::EventDisposition {
        self.action.handle(&event).expect("dispatch")
    }
    pub fn key_down(&mut self, key: KeyEvent) -> core_events::EventDisposition {
        self.send(Event::Input(InputEvent::KeyDown(key)))
    }
    pub fn key_up(&mut self, key: KeyEvent) -> core_events::EventDisposition {
        self.send(Event::Input(InputEvent::KeyUp(key)))
    }
    /// Key-down then key-up of the same key.
    pub fn press(&mut self, key: KeyEvent) -> core_events::EventDisposition {
        let d = self.key_down(key);
        self.key_up(key);
        d
    }
    pub fn paste(&mut self) -> core_events::EventDisposition {
        self.send(Event::Input(InputEvent::Paste))
    }
    pub fn answer(&mut self, ticket: PasteTicket, text: Option<&str>) {
        self.send(Event::PasteText {
            ticket,
            text: text.map(str::to_string),
        });
    }
    pub fn last_prompt(&self) -> PasteTicket {
        *self.prompts.borrow().last().expect("prompt requested")
    }
}

pub fn key(code: u32) -> KeyEvent {
    KeyEvent::new(code)
}

pub fn ctrl(code: u32) -> KeyEvent {
    KeyEvent::with_mods(code, KeyModifiers::CTRL)
}

pub fn shift(code: u32) -> KeyEvent {
    KeyEvent::with_mods(code, KeyModifiers::SHIFT)
}

// -------------------------------------------------------------------------------------------------
// Log capture
// -------------------------------------------------------------------------------------------------

#[derive(Clone)]
pub struct BufferWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl BufferWriter {
    pub fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        (Self { inner: buf.clone() }, buf)
    }
}

pub struct LockedWriter<'a> {
    guard: MutexGuard<'a, Vec<u8>>,
}

impl<'a> Write for LockedWriter<'a> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for BufferWriter {
    type Writer = LockedWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LockedWriter {
            guard: self.inner.lock().expect("log buffer poisoned"),
        }
    }
}

/// Run `f` with a trace-level subscriber and return everything it logged.
pub fn capture_logs(f: impl FnOnce()) -> String {
    let (writer, buffer) = BufferWriter::new();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_target(true)
        .with_ansi(false)
        .without_time()
        .with_writer(writer)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.lock().expect("log buffer poisoned").clone();
    String::from_utf8(bytes).expect("utf8 logs")
}
