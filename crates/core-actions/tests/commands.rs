mod common;
use common::*;

use core_actions::{Action, Command, CommandOutcome, DispatchError, EditorSession, FocusRegistry};
use core_config::{Mode, Settings};
use core_document::{Document, MemoryDocument};
use core_events::{CHORDS_SUPPRESSED, KeyEvent, KeyModifiers, key};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::Ordering;

type Calls = Rc<RefCell<Vec<String>>>;

/// Action whose default commands record their name and return `outcome`.
fn recording(html: &str, settings: Settings, outcome: CommandOutcome) -> (Action<MemoryDocument>, Calls) {
    let calls: Calls = Rc::default();
    let mut session = EditorSession::new(
        MemoryDocument::from_html(html),
        settings,
        FocusRegistry::new(),
    );
    for name in ["bold", "italicize", "underline", "paste"] {
        let calls = calls.clone();
        session.register_command(name, move |_, _| {
            calls.borrow_mut().push(name.to_string());
            outcome
        });
    }
    let mut action = Action::new(session);
    action.setup().unwrap();
    (action, calls)
}

fn down(action: &mut Action<MemoryDocument>, key: KeyEvent) -> core_events::EventDisposition {
    action
        .handle(&core_events::Event::Input(core_events::InputEvent::KeyDown(key)))
        .unwrap()
}

#[test]
fn bound_chord_runs_named_command_and_halts() {
    let (mut action, calls) = recording("<p></p>", Settings::default(), CommandOutcome::Halt);
    let d = down(&mut action, ctrl(66));
    assert!(d.default_prevented());
    assert!(d.propagation_stopped());
    assert_eq!(*calls.borrow(), vec!["bold".to_string()]);
}

#[test]
fn meta_counts_as_command_in_auto_mode() {
    let (mut action, calls) = recording("<p></p>", Settings::default(), CommandOutcome::Chain);
    let d = down(&mut action, KeyEvent::with_mods(73, KeyModifiers::META));
    assert!(d.default_prevented());
    assert_eq!(*calls.borrow(), vec!["italicize".to_string()]);
}

#[test]
fn ctrl_only_modifier_ignores_meta() {
    let settings = Settings {
        modifier: core_config::CommandModifier::Ctrl,
        ..Settings::default()
    };
    let (mut action, calls) = recording("<p></p>", settings, CommandOutcome::Halt);
    let d = down(&mut action, KeyEvent::with_mods(66, KeyModifiers::META));
    assert!(d.is_empty());
    assert!(calls.borrow().is_empty());
}

#[test]
fn continue_outcome_leaves_native_behaviour() {
    let (mut action, calls) = recording("<p></p>", Settings::default(), CommandOutcome::Continue);
    let d = down(&mut action, ctrl(85));
    assert!(d.is_empty());
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn unbound_chord_passes_through() {
    let (mut action, calls) = recording("<p>a</p>", Settings::default(), CommandOutcome::Halt);
    let d = down(&mut action, ctrl(65));
    assert!(d.is_empty());
    assert!(calls.borrow().is_empty());
}

#[test]
fn restricted_modes_suppress_everything_but_paste() {
    for mode in [Mode::Inline, Mode::Partial] {
        let settings = Settings {
            mode,
            ..Settings::default()
        };
        let (mut action, calls) = recording("<p></p>", settings, CommandOutcome::Continue);
        let before = CHORDS_SUPPRESSED.load(Ordering::Relaxed);
        let d = down(&mut action, ctrl(66));
        assert!(d.default_prevented(), "{mode:?}");
        assert!(!d.propagation_stopped());
        assert!(calls.borrow().is_empty());
        assert!(CHORDS_SUPPRESSED.load(Ordering::Relaxed) > before);

        let d = down(&mut action, ctrl(86));
        assert!(d.is_empty());
        assert_eq!(*calls.borrow(), vec!["paste".to_string()]);
    }
}

#[test]
fn inline_rich_allows_formatting_chords() {
    let settings = Settings {
        mode: Mode::InlineRich,
        ..Settings::default()
    };
    let (mut action, calls) = recording("<p></p>", settings, CommandOutcome::Halt);
    assert!(down(&mut action, ctrl(66)).default_prevented());
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn direct_command_receives_session_and_event() {
    let (mut action, _) = recording("<p>x</p>", Settings::default(), CommandOutcome::Halt);
    action.session_mut().bind(
        75,
        Command::direct(|session: &mut EditorSession<MemoryDocument>, event: &KeyEvent| {
            assert!(event.ctrl());
            session.document_mut().set_inner_html("<p>linked</p>");
            CommandOutcome::Halt
        }),
    );
    let d = down(&mut action, ctrl(75));
    assert!(d.propagation_stopped());
    assert_eq!(action.document().inner_html(), "<p>linked</p>");
}

#[test]
fn unknown_name_bound_after_setup_fails_at_dispatch() {
    let (mut action, _) = recording("<p></p>", Settings::default(), CommandOutcome::Halt);
    action.session_mut().bind(75, Command::named("link"));
    let err = action
        .handle(&core_events::Event::Input(core_events::InputEvent::KeyDown(ctrl(75))))
        .unwrap_err();
    assert_eq!(err, DispatchError::UnknownCommand("link".into()));
    assert_eq!(err.to_string(), "unknown command `link`");
}

#[test]
fn ime_composition_key_is_ignored() {
    let (mut action, calls) = recording("<p></p>", Settings::default(), CommandOutcome::Halt);
    action.session_mut().bind(key::IME_PROCESS, Command::named("bold"));
    let d = down(&mut action, ctrl(key::IME_PROCESS));
    assert!(d.is_empty());
    assert!(calls.borrow().is_empty());
    assert!(!action.session().cache().command_held);
}

#[test]
fn continuing_chord_falls_through_to_structural_editing() {
    let (mut action, _) = recording("<p>a</p><p></p>", Settings::default(), CommandOutcome::Continue);
    action
        .session_mut()
        .bind(key::ENTER, Command::direct(|_, _| CommandOutcome::Continue));
    let p = action.document().child(1).unwrap();
    action.document_mut().set_caret(p, 0);
    let d = down(&mut action, ctrl(key::ENTER));
    assert!(d.default_prevented());
    assert!(!d.propagation_stopped());
    assert_eq!(action.document().inner_html(), "<p>a</p><p></p><hr><p></p>");
}

#[test]
fn halting_chord_skips_structural_editing() {
    let (mut action, _) = recording("<p>a</p><p></p>", Settings::default(), CommandOutcome::Halt);
    action
        .session_mut()
        .bind(key::ENTER, Command::direct(|_, _| CommandOutcome::Halt));
    let p = action.document().child(1).unwrap();
    action.document_mut().set_caret(p, 0);
    let d = down(&mut action, ctrl(key::ENTER));
    assert!(d.propagation_stopped());
    assert_eq!(action.document().inner_html(), "<p>a</p><p></p>");
}

#[test]
fn rich_paste_chord_at_cap_is_vetoed() {
    let settings = Settings {
        max_length: 3,
        paste_as_text: false,
        ..Settings::default()
    };
    let (mut action, calls) = recording("<p>abc</p>", settings.clone(), CommandOutcome::Continue);
    let p = action.document().child(0).unwrap();
    action.document_mut().set_caret(p, 1);
    let d = down(&mut action, ctrl(key::V));
    assert!(d.default_prevented());
    assert_eq!(*calls.borrow(), vec!["paste".to_string()]);

    // one below the cap the native paste goes ahead
    let (mut action, _) = recording("<p>ab</p>", settings, CommandOutcome::Continue);
    let p = action.document().child(0).unwrap();
    action.document_mut().set_caret(p, 1);
    assert!(down(&mut action, ctrl(key::V)).is_empty());
}

#[test]
fn unbound_chord_at_cap_is_vetoed() {
    let settings = Settings {
        max_length: 1,
        ..Settings::default()
    };
    let (mut action, calls) = recording("<p>a</p>", settings, CommandOutcome::Halt);
    let p = action.document().child(0).unwrap();
    action.document_mut().set_caret(p, 1);
    assert!(down(&mut action, ctrl(65)).default_prevented());
    assert!(calls.borrow().is_empty());
}

#[test]
fn undo_and_redo_as_direct_commands() {
    let mut ed = editor("<p>a</p>", Settings::default());
    ed.action.session_mut().bind(
        key::Z,
        Command::direct(|s: &mut EditorSession<MemoryDocument>, _: &KeyEvent| {
            s.undo();
            CommandOutcome::Halt
        }),
    );
    ed.action.session_mut().bind(
        key::Y,
        Command::direct(|s: &mut EditorSession<MemoryDocument>, _: &KeyEvent| {
            s.redo();
            CommandOutcome::Halt
        }),
    );
    ed.action.session_mut().checkpoint();
    ed.doc_mut().set_inner_html("<p>ab</p>");
    assert!(ed.key_down(ctrl(key::Z)).propagation_stopped());
    assert_eq!(ed.html(), "<p>a</p>");
    ed.key_down(ctrl(key::Y));
    assert_eq!(ed.html(), "<p>ab</p>");
}

// Regression: command key-up inverts rather than clears.
#[test]
fn command_key_up_sets_flag_unless_modifier_still_reported() {
    let mut ed = editor("<p></p>", Settings::default());
    ed.key_down(ctrl(66));
    assert!(ed.action.session().cache().command_held);
    ed.key_up(ctrl(66));
    assert!(!ed.action.session().cache().command_held);
    ed.key_up(key(key::CTRL));
    assert!(ed.action.session().cache().command_held);
    // next key-down recomputes from the event
    ed.key_down(key(65));
    assert!(!ed.action.session().cache().command_held);
}

#[test]
fn shift_tracking_follows_release() {
    let mut ed = editor("<p></p>", Settings::default());
    ed.key_down(shift(key::SHIFT));
    assert!(ed.action.session().cache().shift_held);
    ed.key_up(shift(65));
    assert!(ed.action.session().cache().shift_held);
    ed.key_up(key(key::SHIFT));
    assert!(!ed.action.session().cache().shift_held);
}
