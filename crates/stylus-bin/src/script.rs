//! TOML event scripts and the event source that replays them.
//!
//! ```toml
//! [[event]]
//! kind = "focus"
//!
//! [[event]]
//! kind = "keydown"
//! code = 65
//! text = "a"        # inserted when the native action is left alone
//! caret = [0, 0]    # root child index, child-node offset
//!
//! [[event]]
//! kind = "paste"
//! text = "from the clipboard"
//! wait_ms = 10
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use core_events::{AsyncEventSource, Event, InputEvent, KeyEvent, KeyModifiers};
use serde::Deserialize;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    KeyDown,
    KeyUp,
    /// Key-down followed by key-up.
    Press,
    Focus,
    Blur,
    Paste,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub kind: StepKind,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    /// Typed characters for key-down, clipboard content for paste.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caret: Option<[usize; 2]>,
    #[serde(default)]
    pub wait_ms: u64,
}

impl Step {
    fn key(&self) -> KeyEvent {
        let mut mods = KeyModifiers::empty();
        mods.set(KeyModifiers::CTRL, self.ctrl);
        mods.set(KeyModifiers::META, self.meta);
        mods.set(KeyModifiers::SHIFT, self.shift);
        mods.set(KeyModifiers::ALT, self.alt);
        KeyEvent::with_mods(self.code, mods)
    }
}

/// One native event plus the host-side context that goes with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub input: InputEvent,
    pub caret: Option<[usize; 2]>,
    pub text: Option<String>,
    pub wait: Duration,
}

impl Cue {
    fn bare(input: InputEvent) -> Self {
        Self {
            input,
            caret: None,
            text: None,
            wait: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Script {
    #[serde(default, rename = "event")]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        let script = Self::from_toml_str(&content)
            .with_context(|| format!("parsing script {}", path.display()))?;
        debug!(target: "runtime", path = %path.display(), steps = script.steps.len(), "script_loaded");
        Ok(script)
    }

    /// Flatten steps into one cue per native event. A press yields a key-down carrying the
    /// step's context and a bare key-up.
    pub fn cues(&self) -> Vec<Cue> {
        let mut out = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let first = match step.kind {
                StepKind::KeyDown | StepKind::Press => InputEvent::KeyDown(step.key()),
                StepKind::KeyUp => InputEvent::KeyUp(step.key()),
                StepKind::Focus => InputEvent::Focus,
                StepKind::Blur => InputEvent::Blur,
                StepKind::Paste => InputEvent::Paste,
            };
            out.push(Cue {
                input: first,
                caret: step.caret,
                text: step.text.clone(),
                wait: Duration::from_millis(step.wait_ms),
            });
            if step.kind == StepKind::Press {
                out.push(Cue::bare(InputEvent::KeyUp(step.key())));
            }
        }
        out
    }
}

/// Sends each cue's native event in order, then `Event::Shutdown`.
pub struct ScriptEventSource {
    cues: Vec<Cue>,
}

impl ScriptEventSource {
    pub fn new(cues: Vec<Cue>) -> Self {
        Self { cues }
    }
}

impl AsyncEventSource for ScriptEventSource {
    fn name(&self) -> &'static str {
        "script"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            for cue in self.cues {
                if !cue.wait.is_zero() {
                    tokio::time::sleep(cue.wait).await;
                }
                if tx.send(Event::Input(cue.input)).await.is_err() {
                    trace!(target: "runtime.events", "script_channel_closed");
                    return;
                }
            }
            let _ = tx.send(Event::Shutdown).await;
        })
    }
}
