//! Browser `keyCode` table and keystroke classification.
//!
//! Codes are the legacy numeric values hosts still report on keydown/keyup. Only the codes
//! the dispatcher reasons about are named here.

use crate::KeyEvent;

pub const BACKSPACE: u32 = 8;
pub const TAB: u32 = 9;
pub const ENTER: u32 = 13;
pub const SHIFT: u32 = 16;
pub const CTRL: u32 = 17;
pub const ALT: u32 = 18;
pub const PAUSE: u32 = 19;
pub const CAPS_LOCK: u32 = 20;
pub const ESCAPE: u32 = 27;
pub const PAGE_UP: u32 = 33;
pub const PAGE_DOWN: u32 = 34;
pub const END: u32 = 35;
pub const HOME: u32 = 36;
pub const LEFT: u32 = 37;
pub const UP: u32 = 38;
pub const RIGHT: u32 = 39;
pub const DOWN: u32 = 40;
pub const INSERT: u32 = 45;
pub const DELETE: u32 = 46;
pub const META_LEFT: u32 = 91;
pub const META_RIGHT: u32 = 92;
pub const CONTEXT_MENU: u32 = 93;
pub const F1: u32 = 112;
pub const F12: u32 = 123;
pub const NUM_LOCK: u32 = 144;
pub const SCROLL_LOCK: u32 = 145;
/// Firefox reports the command key with its own code.
pub const META_GECKO: u32 = 224;
/// Emitted ahead of IME composition keystrokes; carries no key identity.
pub const IME_PROCESS: u32 = 229;

pub const B: u32 = 66;
pub const I: u32 = 73;
pub const U: u32 = 85;
pub const V: u32 = 86;
pub const Y: u32 = 89;
pub const Z: u32 = 90;

/// Keys that never add characters to the document. Modifiers held alongside are ignored.
pub fn is_special(event: &KeyEvent) -> bool {
    matches!(
        event.code,
        BACKSPACE
            | SHIFT
            | CTRL
            | ALT
            | PAUSE
            | CAPS_LOCK
            | ESCAPE
            | INSERT
            | DELETE
            | META_LEFT
            | META_RIGHT
            | CONTEXT_MENU
            | NUM_LOCK
            | SCROLL_LOCK
            | META_GECKO
    ) || (F1..=F12).contains(&event.code)
}

/// Caret movement keys.
pub fn is_navigational(event: &KeyEvent) -> bool {
    matches!(event.code, PAGE_UP..=DOWN)
}
