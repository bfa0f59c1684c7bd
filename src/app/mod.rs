pub mod background;
pub mod input;
pub mod messages;
pub mod runtime;

pub use messages::BackgroundMessage;
pub use runtime::run_tui;

use crate::gemini::GeminiClient;
use std::sync::mpsc;

/// Shared handles the input layer needs to spawn background work.
///
/// The client is owned here rather than by `App` so that saving a new
/// API key mid-session swaps it in one place.
pub struct RuntimeContext<'a> {
    pub tx: &'a mpsc::Sender<messages::BackgroundMessage>,
    pub client: Option<GeminiClient>,
}

impl RuntimeContext<'_> {
    /// Replace the client after the user saves a fresh API key.
    pub fn install_key(&mut self, api_key: String) {
        self.client = Some(GeminiClient::new(api_key));
    }
}
