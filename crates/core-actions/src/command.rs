//! Command model: key code -> named or direct command, plus the session's named command set.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use core_config::Settings;
use core_document::Document;
use core_events::KeyEvent;

use crate::EditorSession;

/// Name of the only command allowed through in restricted modes.
pub const PASTE_COMMAND: &str = "paste";

/// What a command asks the dispatcher to do with the originating event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command consumed the event.
    Halt,
    /// The command returned the session for chaining; treated like `Halt`.
    Chain,
    /// Let the native behaviour proceed.
    Continue,
}

impl CommandOutcome {
    /// `true` when the native action must be prevented and propagation stopped.
    pub fn suppresses(self) -> bool {
        matches!(self, Self::Halt | Self::Chain)
    }
}

pub type CommandFn<D> = Rc<dyn Fn(&mut EditorSession<D>, &KeyEvent) -> CommandOutcome>;

/// A command table entry.
pub enum Command<D: Document> {
    Named(String),
    Direct(CommandFn<D>),
}

impl<D: Document> Command<D> {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn direct<F>(f: F) -> Self
    where
        F: Fn(&mut EditorSession<D>, &KeyEvent) -> CommandOutcome + 'static,
    {
        Self::Direct(Rc::new(f))
    }

    pub fn is_paste(&self) -> bool {
        matches!(self, Self::Named(name) if name == PASTE_COMMAND)
    }

    /// Name for logs; direct commands have none.
    pub fn label(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Direct(_) => "<direct>",
        }
    }
}

impl<D: Document> Clone for Command<D> {
    fn clone(&self) -> Self {
        match self {
            Self::Named(name) => Self::Named(name.clone()),
            Self::Direct(f) => Self::Direct(Rc::clone(f)),
        }
    }
}

impl<D: Document> fmt::Debug for Command<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Direct(_) => f.write_str("Direct(..)"),
        }
    }
}

/// Commands a session exposes by name.
pub struct CommandSet<D: Document> {
    by_name: HashMap<String, CommandFn<D>>,
}

impl<D: Document> Default for CommandSet<D> {
    fn default() -> Self {
        Self {
            by_name: HashMap::new(),
        }
    }
}

impl<D: Document> CommandSet<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a named command.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut EditorSession<D>, &KeyEvent) -> CommandOutcome + 'static,
    {
        self.by_name.insert(name.into(), Rc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<CommandFn<D>> {
        self.by_name.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Key code -> command. Later bindings for the same code replace earlier ones.
pub struct CommandTable<D: Document> {
    by_key: BTreeMap<u32, Command<D>>,
}

impl<D: Document> Default for CommandTable<D> {
    fn default() -> Self {
        Self {
            by_key: BTreeMap::new(),
        }
    }
}

impl<D: Document> CommandTable<D> {
    pub fn from_settings(settings: &Settings) -> Self {
        let mut table = Self::default();
        for binding in &settings.commands {
            table.bind(binding.key, Command::named(binding.command.clone()));
        }
        table
    }

    pub fn bind(&mut self, key: u32, command: Command<D>) {
        self.by_key.insert(key, command);
    }

    pub fn unbind(&mut self, key: u32) -> Option<Command<D>> {
        self.by_key.remove(&key)
    }

    pub fn get(&self, key: u32) -> Option<&Command<D>> {
        self.by_key.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Command<D>)> {
        self.by_key.iter().map(|(k, c)| (*k, c))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
