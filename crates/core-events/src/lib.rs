//! Core event types and channel helpers for Stylus.
//!
//! Everything here mirrors the shape of the host's native events: numeric key
//! codes, modifier flags, and the five event kinds an editable root listens to
//! (focus, blur, keydown, keyup, paste). Two synthetic events close the paste
//! coordinator's suspension points (`PasteText`, `PasteSettled`).

use std::fmt;
use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

pub mod key;
mod settle;

pub use key::{is_navigational, is_special};
pub use settle::{SettleScheduler, TokioSettleScheduler};

// -------------------------------------------------------------------------------------------------
// Channel Policy
// -------------------------------------------------------------------------------------------------
// The runtime event loop uses a bounded mpsc channel sized by `EVENT_CHANNEL_CAP`. Producers
// (script sources, settle timers) await capacity rather than dropping events; a dropped keyup
// would desynchronize modifier tracking.
// -------------------------------------------------------------------------------------------------
pub const EVENT_CHANNEL_CAP: usize = 1024;

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Relaxed atomic counters. Inspected by tests and logged by the binary at shutdown.
// -------------------------------------------------------------------------------------------------
pub static KEYDOWN_TOTAL: AtomicU64 = AtomicU64::new(0);
pub static CHORDS_DISPATCHED: AtomicU64 = AtomicU64::new(0);
pub static CHORDS_SUPPRESSED: AtomicU64 = AtomicU64::new(0); // restricted-mode chords
pub static LENGTH_VETOES: AtomicU64 = AtomicU64::new(0);
pub static PASTE_SESSIONS: AtomicU64 = AtomicU64::new(0);
pub static PASTE_BYTES: AtomicU64 = AtomicU64::new(0); // encoded bytes actually inserted

/// Top-level event enum consumed by an editor `Action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Input(InputEvent),
    /// Answer to a plain-text paste request. `None` means the prompt was dismissed.
    PasteText {
        ticket: PasteTicket,
        text: Option<String>,
    },
    /// Settle delay elapsed after a native (rich) paste.
    PasteSettled { ticket: PasteTicket },
    Shutdown,
}

/// Native events fired on the editable root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    Focus,
    Blur,
    KeyDown(KeyEvent),
    KeyUp(KeyEvent),
    Paste,
}

impl InputEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InputEvent::Focus => EventKind::Focus,
            InputEvent::Blur => EventKind::Blur,
            InputEvent::KeyDown(_) => EventKind::KeyDown,
            InputEvent::KeyUp(_) => EventKind::KeyUp,
            InputEvent::Paste => EventKind::Paste,
        }
    }
}

/// Listener slots on an event target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Focus,
    Blur,
    KeyDown,
    KeyUp,
    Paste,
}

impl EventKind {
    /// Attach order. Teardown releases in the same order.
    pub const ALL: [EventKind; 5] = [
        EventKind::Focus,
        EventKind::Blur,
        EventKind::KeyDown,
        EventKind::KeyUp,
        EventKind::Paste,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Focus => "focus",
            EventKind::Blur => "blur",
            EventKind::KeyDown => "keydown",
            EventKind::KeyUp => "keyup",
            EventKind::Paste => "paste",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned by an event target when a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Identifies one in-flight paste. Tickets are never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PasteTicket(pub u64);

impl fmt::Display for PasteTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "paste#{}", self.0)
    }
}

bitflags::bitflags! {
    /// Modifier flags as reported by the native event (`ctrlKey`, `altKey`, `shiftKey`, `metaKey`).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct KeyModifiers: u8 {
        const CTRL = 0b0000_0001;
        const ALT  = 0b0000_0010;
        const SHIFT= 0b0000_0100;
        const META = 0b0000_1000;
    }
}

bitflags::bitflags! {
    /// What the host must do with the native event after a handler ran.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EventDisposition: u8 {
        const PREVENT_DEFAULT  = 0b01;
        const STOP_PROPAGATION = 0b10;
    }
}

impl EventDisposition {
    pub fn pass_through() -> Self {
        Self::empty()
    }
    pub fn prevent() -> Self {
        Self::PREVENT_DEFAULT
    }
    pub fn halt() -> Self {
        Self::PREVENT_DEFAULT | Self::STOP_PROPAGATION
    }
    pub fn default_prevented(&self) -> bool {
        self.contains(Self::PREVENT_DEFAULT)
    }
    pub fn propagation_stopped(&self) -> bool {
        self.contains(Self::STOP_PROPAGATION)
    }
}

/// A keydown/keyup payload: the numeric `keyCode` plus modifier flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: u32,
    pub mods: KeyModifiers,
}

impl KeyEvent {
    pub const fn new(code: u32) -> Self {
        Self {
            code,
            mods: KeyModifiers::empty(),
        }
    }

    pub const fn with_mods(code: u32, mods: KeyModifiers) -> Self {
        Self { code, mods }
    }

    pub fn ctrl(&self) -> bool {
        self.mods.contains(KeyModifiers::CTRL)
    }
    pub fn meta(&self) -> bool {
        self.mods.contains(KeyModifiers::META)
    }
    pub fn shift(&self) -> bool {
        self.mods.contains(KeyModifiers::SHIFT)
    }
    pub fn alt(&self) -> bool {
        self.mods.contains(KeyModifiers::ALT)
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.code, self.mods)
    }
}

// -------------------------------------------------------------------------------------------------
// Async Event Sources
// -------------------------------------------------------------------------------------------------
// Producers that feed the runtime channel (scripted replays today; clipboard bridges later)
// register uniformly. Each source owns its task and must stop once the channel closes.
// -------------------------------------------------------------------------------------------------

/// A producer of `Event`s that runs as its own tokio task.
pub trait AsyncEventSource: Send + 'static {
    /// Stable name for logs.
    fn name(&self) -> &'static str;
    /// Start the task. It must return once `tx.send` fails.
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Sources waiting to be started together.
#[derive(Default)]
pub struct EventSourceRegistry {
    pending: Vec<Box<dyn AsyncEventSource>>,
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: AsyncEventSource>(&mut self, source: S) {
        self.pending.push(Box::new(source));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Start every registered source on its own `Sender` clone and drain the registry.
    ///
    /// Sources only observe shutdown once every `Sender` is gone, so drop the caller's copy
    /// before awaiting the handles.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        self.pending
            .drain(..)
            .map(|source| {
                tracing::info!(target: "runtime.events", source = source.name(), "source_spawned");
                source.spawn(tx.clone())
            })
            .collect()
    }
}
