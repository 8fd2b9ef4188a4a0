//! Per-editor state and the collaborators the dispatcher drives.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use core_config::Settings;
use core_document::{Document, History, NodeId, UndoJournal};
use core_events::{KeyEvent, PasteTicket, SettleScheduler};
use tracing::debug;

use crate::command::{Command, CommandFn, CommandOutcome, CommandSet, CommandTable};
use crate::error::DispatchError;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "editor#{}", self.0)
    }
}

// -------------------------------------------------------------------------------------------------
// Focus registry
// -------------------------------------------------------------------------------------------------

/// Which editor currently has focus. One per application, cloned into every session.
#[derive(Debug, Clone, Default)]
pub struct FocusRegistry {
    active: Rc<Cell<Option<SessionId>>>,
}

impl FocusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&self, id: SessionId) {
        self.active.set(Some(id));
    }

    /// Clear the active editor only if it is still `id`. Returns whether it was cleared.
    pub fn release(&self, id: SessionId) -> bool {
        if self.active.get() == Some(id) {
            self.active.set(None);
            true
        } else {
            false
        }
    }

    pub fn active(&self) -> Option<SessionId> {
        self.active.get()
    }

    pub fn is_active(&self, id: SessionId) -> bool {
        self.active.get() == Some(id)
    }
}

// -------------------------------------------------------------------------------------------------
// Cache and hooks
// -------------------------------------------------------------------------------------------------

/// Transient modifier and caret state. Written only by the modifier and focus trackers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifierCache {
    pub command_held: bool,
    pub shift_held: bool,
    pub focused_element: Option<NodeId>,
    pub focused_element_index: usize,
}

pub type MaxLengthHook<D> = Box<dyn FnMut(&D)>;
pub type DeletionHook<D> = Box<dyn FnMut(&KeyEvent, &mut D) -> bool>;
pub type KeyContextHook<D> = Box<dyn FnMut(&KeyEvent, NodeId, &mut D)>;
pub type InsertHook<D> = Box<dyn FnMut(&mut D)>;

/// Host callbacks. All optional.
pub struct Hooks<D> {
    /// Called with the document when a keystroke is vetoed by the length cap.
    pub max_length_reached: Option<MaxLengthHook<D>>,
    /// Backspace/Delete override; returning `true` skips the built-in cleanup.
    pub on_backspace_or_delete: Option<DeletionHook<D>>,
    /// Key-up callbacks by key code, given the cached focused element.
    pub key_context: HashMap<u32, KeyContextHook<D>>,
    /// Runs right before plain-text paste markup is inserted.
    pub before_insert_html: Option<InsertHook<D>>,
}

impl<D> Default for Hooks<D> {
    fn default() -> Self {
        Self {
            max_length_reached: None,
            on_backspace_or_delete: None,
            key_context: HashMap::new(),
            before_insert_html: None,
        }
    }
}

impl<D> Hooks<D> {
    pub fn on_max_length(mut self, f: impl FnMut(&D) + 'static) -> Self {
        self.max_length_reached = Some(Box::new(f));
        self
    }

    pub fn on_backspace_or_delete(
        mut self,
        f: impl FnMut(&KeyEvent, &mut D) -> bool + 'static,
    ) -> Self {
        self.on_backspace_or_delete = Some(Box::new(f));
        self
    }

    pub fn on_key(mut self, code: u32, f: impl FnMut(&KeyEvent, NodeId, &mut D) + 'static) -> Self {
        self.key_context.insert(code, Box::new(f));
        self
    }

    pub fn before_insert_html(mut self, f: impl FnMut(&mut D) + 'static) -> Self {
        self.before_insert_html = Some(Box::new(f));
        self
    }
}

// -------------------------------------------------------------------------------------------------
// Collaborators
// -------------------------------------------------------------------------------------------------

/// Cleanup and placeholder visibility, run after edits and focus changes.
pub trait Upkeep<D: Document + ?Sized> {
    fn clean(&mut self, doc: &mut D);
    fn refresh_placeholders(&mut self, doc: &D, focused: bool);
}

/// Upkeep that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoUpkeep;

impl<D: Document + ?Sized> Upkeep<D> for NoUpkeep {
    fn clean(&mut self, _doc: &mut D) {}
    fn refresh_placeholders(&mut self, _doc: &D, _focused: bool) {}
}

/// Acquires clipboard plain text. The answer is delivered later as `Event::PasteText`.
pub trait TextPrompt {
    fn request_plain_text(&mut self, ticket: PasteTicket);
}

/// Prompt that never answers; pending pastes wait until destroy.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl TextPrompt for NoPrompt {
    fn request_plain_text(&mut self, ticket: PasteTicket) {
        debug!(target: "actions.paste", %ticket, "no_prompt_installed");
    }
}

/// Scheduler that never fires. Hosts allowing rich paste install a real one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSettle;

impl SettleScheduler for NoSettle {
    fn schedule(&mut self, ticket: PasteTicket, _delay: Duration) {
        debug!(target: "actions.paste", %ticket, "no_scheduler_installed");
    }
    fn cancel(&mut self, _ticket: PasteTicket) -> bool {
        false
    }
    fn cancel_all(&mut self) -> usize {
        0
    }
}

// -------------------------------------------------------------------------------------------------
// Session
// -------------------------------------------------------------------------------------------------

/// Owner of one editable root and everything the dispatcher needs to act on it.
pub struct EditorSession<D: Document> {
    pub(crate) id: SessionId,
    pub(crate) settings: Settings,
    pub(crate) hooks: Hooks<D>,
    pub(crate) commands: CommandSet<D>,
    pub(crate) table: CommandTable<D>,
    pub(crate) cache: ModifierCache,
    pub(crate) document: D,
    pub(crate) journal: Box<dyn UndoJournal<D>>,
    pub(crate) upkeep: Box<dyn Upkeep<D>>,
    pub(crate) prompt: Box<dyn TextPrompt>,
    pub(crate) scheduler: Box<dyn SettleScheduler>,
    pub(crate) focus: FocusRegistry,
}

impl<D: Document + 'static> EditorSession<D> {
    /// New session with a snapshot `History`, no upkeep, no prompt, and a command table built
    /// from `settings.commands`.
    pub fn new(document: D, settings: Settings, focus: FocusRegistry) -> Self {
        let table = CommandTable::from_settings(&settings);
        Self {
            id: SessionId::next(),
            settings,
            hooks: Hooks::default(),
            commands: CommandSet::new(),
            table,
            cache: ModifierCache::default(),
            document,
            journal: Box::new(History::new()),
            upkeep: Box::new(NoUpkeep),
            prompt: Box::new(NoPrompt),
            scheduler: Box::new(NoSettle),
            focus,
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks<D>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_journal(mut self, journal: impl UndoJournal<D> + 'static) -> Self {
        self.journal = Box::new(journal);
        self
    }

    pub fn with_upkeep(mut self, upkeep: impl Upkeep<D> + 'static) -> Self {
        self.upkeep = Box::new(upkeep);
        self
    }

    pub fn with_prompt(mut self, prompt: impl TextPrompt + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    pub fn with_scheduler(mut self, scheduler: impl SettleScheduler + 'static) -> Self {
        self.scheduler = Box::new(scheduler);
        self
    }

    /// Add a named command to the session's command set.
    pub fn register_command<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut EditorSession<D>, &KeyEvent) -> CommandOutcome + 'static,
    {
        self.commands.register(name, f);
    }

    /// Bind a key code in the command table, replacing any earlier binding.
    pub fn bind(&mut self, key: u32, command: Command<D>) {
        self.table.bind(key, command);
    }
}

impl<D: Document> EditorSession<D> {
    pub fn id(&self) -> SessionId {
        self.id
    }
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
    pub fn cache(&self) -> &ModifierCache {
        &self.cache
    }
    pub fn document(&self) -> &D {
        &self.document
    }
    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }
    pub fn focus_registry(&self) -> &FocusRegistry {
        &self.focus
    }
    pub fn commands(&self) -> &CommandSet<D> {
        &self.commands
    }
    pub fn command_table(&self) -> &CommandTable<D> {
        &self.table
    }

    pub fn is_active(&self) -> bool {
        self.focus.is_active(self.id)
    }

    pub fn undo(&mut self) -> bool {
        self.journal.undo(&mut self.document)
    }

    pub fn redo(&mut self) -> bool {
        self.journal.redo(&mut self.document)
    }

    /// Record a discrete undo point for the current document state.
    pub fn checkpoint(&mut self) {
        self.journal.checkpoint(&self.document);
    }

    /// Resolve a table entry to something callable. Named commands go through the command set.
    pub(crate) fn resolve(&self, command: &Command<D>) -> Result<CommandFn<D>, DispatchError> {
        match command {
            Command::Direct(f) => Ok(f.clone()),
            Command::Named(name) => self
                .commands
                .get(name)
                .ok_or_else(|| DispatchError::UnknownCommand(name.clone())),
        }
    }

    /// Every named table entry must exist in the command set.
    pub(crate) fn validate_commands(&self) -> Result<(), DispatchError> {
        for (_, command) in self.table.iter() {
            if let Command::Named(name) = command
                && !self.commands.contains(name)
            {
                return Err(DispatchError::UnknownCommand(name.clone()));
            }
        }
        Ok(())
    }

    /// Cleanup followed by placeholder refresh.
    pub(crate) fn run_upkeep(&mut self) {
        self.upkeep.clean(&mut self.document);
        self.refresh_placeholders();
    }

    pub(crate) fn refresh_placeholders(&mut self) {
        let focused = self.is_active();
        self.upkeep.refresh_placeholders(&self.document, focused);
    }
}
