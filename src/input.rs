//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] actions.  Keys that control the
//! monitor only queue a command on the app; the main loop forwards it.
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action (if one doesn't exist).
//! 2. Add a `KeyCode` match arm in [`handle_key_event`] that calls it.
//! 3. Update the help text in [`crate::ui`].

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::App;

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Char('s') => app.toggle_running(),
        KeyCode::Char('m') => app.switch_source(),
        KeyCode::Char('r') => app.check_now(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::MonitorCommand;
    use crate::source::SourceKind;
    use crate::status::ServiceStatus;
    use crossterm::event::KeyModifiers;

    fn press(app: &mut App, code: KeyCode) {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn q_and_esc_quit() {
        let mut app = App::new(ServiceStatus::new("page", 60), SourceKind::Api);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.quit);

        let mut app = App::new(ServiceStatus::new("page", 60), SourceKind::Api);
        press(&mut app, KeyCode::Esc);
        assert!(app.quit);
    }

    #[test]
    fn release_events_are_ignored() {
        let mut app = App::new(ServiceStatus::new("page", 60), SourceKind::Api);
        let mut key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        handle_key_event(&mut app, key);
        assert!(!app.quit);
    }

    #[test]
    fn m_then_s_starts_the_other_source() {
        let mut app = App::new(ServiceStatus::new("page", 60), SourceKind::Api);
        press(&mut app, KeyCode::Char('m'));
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.take_commands(), vec![MonitorCommand::Start(SourceKind::Scrape)]);
    }
}
