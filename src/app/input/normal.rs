use crate::app::background;
use crate::app::messages::BackgroundMessage;
use crate::app::RuntimeContext;
use crate::export;
use crate::pipeline;
use crate::ui::{ActivePanel, App, InputMode, NarrationStatus, Overlay};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

enum NarrationScope {
    Selected,
    All,
}

pub(super) fn handle_normal_mode(
    app: &mut App,
    key: KeyEvent,
    ctx: &RuntimeContext,
) -> Result<()> {
    // The walkthrough swallows navigation keys while open
    if app.slideshow.is_some() {
        match key.code {
            KeyCode::Char('q') => app.should_quit = true,
            KeyCode::Left | KeyCode::Char('h') => app.slide_prev(),
            KeyCode::Right | KeyCode::Char('l') => app.slide_next(),
            KeyCode::Char('v') | KeyCode::Esc => app.toggle_slideshow(),
            _ => {}
        }
        return Ok(());
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.overlay = Overlay::Help { scroll: 0 },
        KeyCode::Tab => {
            if app.plan.is_some() {
                app.active_panel = match app.active_panel {
                    ActivePanel::Steps => ActivePanel::Chat,
                    ActivePanel::Chat => ActivePanel::Steps,
                };
            }
        }
        KeyCode::Down | KeyCode::Char('j') => match app.active_panel {
            ActivePanel::Steps => app.select_next_step(),
            ActivePanel::Chat => app.chat_scroll = app.chat_scroll.saturating_sub(1),
        },
        KeyCode::Up | KeyCode::Char('k') => match app.active_panel {
            ActivePanel::Steps => app.select_prev_step(),
            ActivePanel::Chat => app.chat_scroll = app.chat_scroll.saturating_add(1),
        },
        KeyCode::Enter => match app.active_panel {
            ActivePanel::Steps => app.open_step_detail(),
            ActivePanel::Chat => app.input_mode = InputMode::Chat,
        },
        KeyCode::Char('v') => app.toggle_slideshow(),
        KeyCode::Char('c') => {
            if app.plan.is_some() {
                app.active_panel = ActivePanel::Chat;
                app.input_mode = InputMode::Chat;
            }
        }
        KeyCode::Char('x') => start_export(app, ctx),
        KeyCode::Char('n') => start_narration(app, ctx, NarrationScope::Selected),
        KeyCode::Char('N') => start_narration(app, ctx, NarrationScope::All),
        KeyCode::Char('r') => retry_after_error(app, ctx),
        KeyCode::Char('s') => {
            app.overlay = Overlay::KeyEntry {
                input: String::new(),
                error: None,
            };
        }
        KeyCode::Char('d') => switch_to_demo(app, ctx),
        _ => {}
    }
    Ok(())
}

fn start_export(app: &mut App, ctx: &RuntimeContext) {
    let (Some(plan), Some(session)) = (app.plan.clone(), app.session.clone()) else {
        return;
    };
    app.show_toast("Exporting the plan");
    let tx = ctx.tx.clone();
    background::spawn_background(ctx.tx.clone(), "export_html", async move {
        match export::export_html(&session, &plan) {
            Ok(path) => {
                let _ = tx.send(BackgroundMessage::ExportDone(path));
            }
            Err(e) => {
                let _ = tx.send(BackgroundMessage::ExportFailed(format!("{:#}", e)));
            }
        }
    });
}

fn start_narration(app: &mut App, ctx: &RuntimeContext, scope: NarrationScope) {
    if app.demo_mode {
        app.show_toast("Narration is offline in the demo workshop");
        return;
    }
    let (Some(plan), Some(session)) = (app.plan.clone(), app.session.clone()) else {
        return;
    };
    let Some(client) = &ctx.client else {
        app.show_toast("No API key saved. Press s to add one.");
        return;
    };

    let wanted: Vec<usize> = match scope {
        NarrationScope::Selected => vec![app.selected_step],
        NarrationScope::All => (0..plan.steps.len()).collect(),
    };
    // Narrate fresh steps and retry unavailable ones; never redo audio
    // that already exists or is in flight.
    let indices: Vec<usize> = wanted
        .into_iter()
        .filter(|&i| {
            app.steps
                .get(i)
                .map(|card| {
                    matches!(
                        card.narration,
                        NarrationStatus::None | NarrationStatus::Unavailable(_)
                    )
                })
                .unwrap_or(false)
        })
        .collect();
    if indices.is_empty() {
        app.show_toast("Nothing left to narrate");
        return;
    }

    let client = client.clone();
    let settings = app.settings.clone();
    let tx = ctx.tx.clone();
    background::spawn_background(ctx.tx.clone(), "narration", async move {
        pipeline::narrate_steps(&client, &settings, &session, &plan, &indices, &tx).await;
    });
}

fn retry_after_error(app: &mut App, ctx: &RuntimeContext) {
    if app.error.is_none() {
        return;
    }
    app.error = None;
    background::spawn_pipeline(app, ctx);
}

fn switch_to_demo(app: &mut App, ctx: &RuntimeContext) {
    if app.error.is_none() || app.demo_mode {
        return;
    }
    app.demo_mode = true;
    background::spawn_pipeline(app, ctx);
}
