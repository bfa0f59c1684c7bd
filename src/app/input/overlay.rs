use crate::app::background;
use crate::app::RuntimeContext;
use crate::ui::{App, Overlay};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

/// Handle key events while an overlay is active. Every key is consumed
/// here so bench bindings cannot fire underneath an open overlay.
pub(super) fn handle_overlay_input(
    app: &mut App,
    key: KeyEvent,
    ctx: &mut RuntimeContext,
) -> Result<()> {
    // Photo picker: choose the broken object first, then the scrap pile.
    if let Overlay::Picker(state) = &mut app.overlay {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                // Without both photos there is nothing to work on.
                app.should_quit = true;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if state.selected + 1 < state.files.len() {
                    state.selected += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                state.selected = state.selected.saturating_sub(1);
            }
            KeyCode::Enter => choose_photo(app, ctx),
            _ => {}
        }
        return Ok(());
    }

    // Manual API-key entry.
    if let Overlay::KeyEntry { input, error } = &mut app.overlay {
        match key.code {
            KeyCode::Esc => app.close_overlay(),
            KeyCode::Enter => save_api_key(app, ctx),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => {
                input.push(c);
                *error = None;
            }
            _ => {}
        }
        return Ok(());
    }

    // Help and step detail share plain scroll-and-close handling.
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => app.close_overlay(),
        KeyCode::Down | KeyCode::Char('j') => scroll_overlay(app, 1),
        KeyCode::Up | KeyCode::Char('k') => scroll_overlay(app, -1),
        _ => {}
    }
    Ok(())
}

/// Assign the highlighted file to whichever photo slot is still open.
/// The pipeline starts as soon as both slots are filled.
fn choose_photo(app: &mut App, ctx: &RuntimeContext) {
    let Overlay::Picker(state) = &mut app.overlay else {
        return;
    };
    let Some(path) = state.files.get(state.selected).cloned() else {
        return;
    };

    if state.broken.is_none() {
        state.broken = Some(path.clone());
        app.broken_path = Some(path);
        return;
    }

    app.scrap_path = Some(path);
    app.close_overlay();
    background::spawn_pipeline(app, ctx);
}

/// Persist the pasted key, swap in a fresh client, and retry whatever
/// the missing key interrupted.
fn save_api_key(app: &mut App, ctx: &mut RuntimeContext) {
    let Overlay::KeyEntry { input, error } = &mut app.overlay else {
        return;
    };
    let key = input.trim().to_string();
    if key.is_empty() {
        *error = Some("Paste a key first".to_string());
        return;
    }

    match app.config.set_api_key(&key) {
        Ok(()) => {
            ctx.install_key(key);
            app.close_overlay();
            app.show_toast("+ API key saved");
            background::spawn_pipeline(app, ctx);
        }
        Err(e) => *error = Some(e),
    }
}

fn scroll_overlay(app: &mut App, delta: isize) {
    let scroll = match &mut app.overlay {
        Overlay::Help { scroll } => scroll,
        Overlay::StepDetail { scroll, .. } => scroll,
        _ => return,
    };
    if delta < 0 {
        *scroll = scroll.saturating_sub(delta.unsigned_abs());
    } else {
        *scroll = scroll.saturating_add(delta as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::PipelineSettings;
    use crate::ui::PickerState;
    use crossterm::event::KeyModifiers;
    use std::path::PathBuf;
    use std::sync::mpsc;

    fn test_app() -> App {
        let config = Config::default();
        let settings = PipelineSettings::from_config(&config);
        App::new(config, settings, false)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn picker_assigns_broken_then_scrap() {
        let mut app = test_app();
        let files = vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")];
        app.overlay = Overlay::Picker(PickerState::new(files));
        let (tx, _rx) = mpsc::channel();
        let mut ctx = RuntimeContext {
            tx: &tx,
            client: None,
        };

        handle_overlay_input(&mut app, press(KeyCode::Enter), &mut ctx).unwrap();
        assert_eq!(app.broken_path, Some(PathBuf::from("a.jpg")));
        assert!(matches!(app.overlay, Overlay::Picker(_)));

        handle_overlay_input(&mut app, press(KeyCode::Char('j')), &mut ctx).unwrap();
        handle_overlay_input(&mut app, press(KeyCode::Enter), &mut ctx).unwrap();
        assert_eq!(app.scrap_path, Some(PathBuf::from("b.jpg")));
        // No client on hand, so the launch attempt lands on key entry.
        assert!(matches!(app.overlay, Overlay::KeyEntry { .. }));
    }

    #[test]
    fn picker_selection_stays_in_bounds() {
        let mut app = test_app();
        let files = vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")];
        app.overlay = Overlay::Picker(PickerState::new(files));
        let (tx, _rx) = mpsc::channel();
        let mut ctx = RuntimeContext {
            tx: &tx,
            client: None,
        };

        for _ in 0..5 {
            handle_overlay_input(&mut app, press(KeyCode::Char('j')), &mut ctx).unwrap();
        }
        if let Overlay::Picker(state) = &app.overlay {
            assert_eq!(state.selected, 1);
        } else {
            panic!("picker closed unexpectedly");
        }

        for _ in 0..5 {
            handle_overlay_input(&mut app, press(KeyCode::Char('k')), &mut ctx).unwrap();
        }
        if let Overlay::Picker(state) = &app.overlay {
            assert_eq!(state.selected, 0);
        } else {
            panic!("picker closed unexpectedly");
        }
    }

    #[test]
    fn picker_escape_quits() {
        let mut app = test_app();
        app.overlay = Overlay::Picker(PickerState::new(vec![]));
        let (tx, _rx) = mpsc::channel();
        let mut ctx = RuntimeContext {
            tx: &tx,
            client: None,
        };

        handle_overlay_input(&mut app, press(KeyCode::Esc), &mut ctx).unwrap();
        assert!(app.should_quit);
    }

    #[test]
    fn key_entry_collects_typed_characters() {
        let mut app = test_app();
        app.overlay = Overlay::KeyEntry {
            input: String::new(),
            error: Some("old".to_string()),
        };
        let (tx, _rx) = mpsc::channel();
        let mut ctx = RuntimeContext {
            tx: &tx,
            client: None,
        };

        for c in "AIza".chars() {
            handle_overlay_input(&mut app, press(KeyCode::Char(c)), &mut ctx).unwrap();
        }
        handle_overlay_input(&mut app, press(KeyCode::Backspace), &mut ctx).unwrap();

        if let Overlay::KeyEntry { input, error } = &app.overlay {
            assert_eq!(input, "AIz");
            assert!(error.is_none());
        } else {
            panic!("key entry closed unexpectedly");
        }
    }

    #[test]
    fn key_entry_rejects_empty_submit() {
        let mut app = test_app();
        app.overlay = Overlay::KeyEntry {
            input: "   ".to_string(),
            error: None,
        };
        let (tx, _rx) = mpsc::channel();
        let mut ctx = RuntimeContext {
            tx: &tx,
            client: None,
        };

        handle_overlay_input(&mut app, press(KeyCode::Enter), &mut ctx).unwrap();
        if let Overlay::KeyEntry { error, .. } = &app.overlay {
            assert!(error.is_some());
        } else {
            panic!("key entry closed on empty submit");
        }
    }

    #[test]
    fn help_scrolls_and_closes() {
        let mut app = test_app();
        app.overlay = Overlay::Help { scroll: 0 };
        let (tx, _rx) = mpsc::channel();
        let mut ctx = RuntimeContext {
            tx: &tx,
            client: None,
        };

        handle_overlay_input(&mut app, press(KeyCode::Char('j')), &mut ctx).unwrap();
        handle_overlay_input(&mut app, press(KeyCode::Char('j')), &mut ctx).unwrap();
        handle_overlay_input(&mut app, press(KeyCode::Char('k')), &mut ctx).unwrap();
        assert_eq!(app.overlay, Overlay::Help { scroll: 1 });

        handle_overlay_input(&mut app, press(KeyCode::Char('?')), &mut ctx).unwrap();
        assert_eq!(app.overlay, Overlay::None);
    }
}
