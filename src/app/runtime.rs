//! TUI runtime: terminal setup, the event loop, and the initial
//! pipeline kick-off.

use crate::app::messages::BackgroundMessage;
use crate::app::{background, input, RuntimeContext};
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::media;
use crate::pipeline::PipelineSettings;
use crate::ui;
use crate::ui::{App, Overlay, PickerState};
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

/// Run the TUI with the pipeline in the background.
pub async fn run_tui(
    config: Config,
    settings: PipelineSettings,
    client: Option<GeminiClient>,
    broken: Option<PathBuf>,
    scrap: Option<PathBuf>,
    demo: bool,
) -> Result<()> {
    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, settings, demo);
    app.broken_path = broken;
    app.scrap_path = scrap;

    // Create channel for background tasks
    let (tx, rx) = mpsc::channel::<BackgroundMessage>();
    let mut ctx = RuntimeContext {
        tx: &tx,
        client,
    };

    if app.demo_mode || (app.broken_path.is_some() && app.scrap_path.is_some()) {
        background::spawn_pipeline(&mut app, &ctx);
    } else {
        // Missing photos: offer everything under the working directory
        let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut picker = PickerState::new(media::find_photos(&root));
        picker.broken = app.broken_path.clone();
        app.overlay = Overlay::Picker(picker);
    }

    let result = run_loop(&mut terminal, &mut app, rx, &mut ctx);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Main event loop with background message handling
fn run_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<BackgroundMessage>,
    ctx: &mut RuntimeContext,
) -> Result<()> {
    loop {
        // Clear expired toasts
        app.clear_expired_toast();

        // Advance spinner animation
        app.tick_loading();

        // Check for background messages (non-blocking)
        background::drain_messages(app, &rx);

        // Render
        terminal.draw(|f| ui::render(f, app))?;

        // Poll for events with fast timeout (snappy animations)
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                input::handle_key_event(app, key, ctx)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
