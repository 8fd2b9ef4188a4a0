//! Command and shift tracking.

use core_config::CommandModifier;
use core_events::{KeyEvent, key};
use tracing::trace;

use crate::ModifierCache;

/// Whether `event` carries the modifier that turns a keystroke into a chord.
pub fn is_command(event: &KeyEvent, modifier: CommandModifier) -> bool {
    match modifier {
        CommandModifier::Ctrl => event.ctrl(),
        CommandModifier::Cmd => event.meta(),
        CommandModifier::Auto => event.ctrl() || event.meta(),
    }
}

pub(crate) fn on_key_down(cache: &mut ModifierCache, event: &KeyEvent, modifier: CommandModifier) {
    cache.command_held = is_command(event, modifier);
    cache.shift_held = event.shift();
    trace!(target: "actions.modifier", code = event.code, command_held = cache.command_held, shift_held = cache.shift_held, "key_down");
}

pub(crate) fn on_key_up(cache: &mut ModifierCache, event: &KeyEvent, modifier: CommandModifier) {
    // Inverted: a key-up still reporting the modifier clears the flag, any other key-up sets it.
    cache.command_held = !is_command(event, modifier);
    if event.code == key::SHIFT || !event.shift() {
        cache.shift_held = false;
    }
    trace!(target: "actions.modifier", code = event.code, command_held = cache.command_held, shift_held = cache.shift_held, "key_up");
}
