//! Keyboard dispatch. Overlays capture keys first, then the chat input
//! line, then the normal bench keys.

use crate::app::RuntimeContext;
use crate::ui::{App, InputMode, Overlay};
use anyhow::Result;
use crossterm::event::KeyEvent;

mod chat;
mod normal;
mod overlay;

use chat::handle_chat_input;
use normal::handle_normal_mode;
use overlay::handle_overlay_input;

pub fn handle_key_event(app: &mut App, key: KeyEvent, ctx: &mut RuntimeContext) -> Result<()> {
    if app.overlay != Overlay::None {
        return handle_overlay_input(app, key, ctx);
    }

    match app.input_mode {
        InputMode::Chat => handle_chat_input(app, key, ctx),
        InputMode::Normal => handle_normal_mode(app, key, ctx),
    }
}
