//! Input event orchestration and editing-command dispatch.
//!
//! An `Action` owns one `EditorSession` and turns native focus, blur, key and paste events into
//! tree edits and command invocations:
//!
//! * key-down: IME guard, modifier tracking, chord resolution, length cap, Enter and
//!   Backspace/Delete structuring (first stage that stops wins)
//! * key-up: modifier tracking, upkeep, focus tracking, key-context hook
//! * paste: undo checkpoint, then plain-text prompt or rich-paste settle task
//!
//! The session's collaborators (`Document`, `UndoJournal`, `Upkeep`, `TextPrompt`,
//! `SettleScheduler`) are traits so hosts plug in their own tree and timers.

mod action;
mod command;
pub mod dispatcher;
mod error;
mod session;

pub use action::{Action, ListenerRegistry};
pub use command::{Command, CommandFn, CommandOutcome, CommandSet, CommandTable, PASTE_COMMAND};
pub use dispatcher::{DispatchResult, StructuralKind, is_command};
pub use error::DispatchError;
pub use session::{
    DeletionHook, EditorSession, FocusRegistry, Hooks, InsertHook, KeyContextHook, MaxLengthHook,
    ModifierCache, NoPrompt, NoSettle, NoUpkeep, SessionId, TextPrompt, Upkeep,
};
