//! Scrapsmith UI - the workbench
//!
//! Layout:
//! ╔══════════════════════════════════════════════════════════════╗
//! ║  SCRAPSMITH            session name              tokens      ║
//! ╠═══════════════════════════╦══════════════════════════════════╣
//! ║  BENCH NOTES              ║  REPAIR STEPS                    ║
//! ║  damage report            ║  1 ✓ [join] Glue the crack       ║
//! ║  scrap inventory          ║  2 ⠼ [cut]  Cut the splint       ║
//! ║  session artifacts        ║  3 ▧ [test] Load it gently       ║
//! ╠═══════════════════════════╩══════════════════════════════════╣
//! ║  chat / status line / key hints                              ║
//! ╚══════════════════════════════════════════════════════════════╝
//!
//! State lives here; drawing lives in `render/`; key handling in
//! `app/input`.

pub mod helpers;
pub mod markdown;
pub mod render;
pub mod theme;

pub use render::render;

use crate::config::Config;
use crate::gemini::artist::ArtSource;
use crate::gemini::chat::{ChatRole, ChatSession, ChatTurn};
use crate::gemini::{FailureKind, TokenUsage};
use crate::pipeline::{PipelineSettings, PipelineStage};
use crate::plan::RepairPlan;
use crate::session::Session;
use std::path::PathBuf;
use std::time::Instant;

/// Which pane has keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivePanel {
    #[default]
    Steps,
    Chat,
}

/// Input mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Chat,
}

/// Loading state for background tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadingState {
    #[default]
    None,
    PreparingPhotos,
    ConsultingAnalyst,
    Illustrating,
    Narrating,
    Answering,
}

impl LoadingState {
    pub fn is_loading(&self) -> bool {
        !matches!(self, LoadingState::None)
    }
}

/// Spinner animation frames (braille pattern)
pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Overlay state
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Overlay {
    #[default]
    None,
    Help {
        scroll: usize,
    },
    StepDetail {
        step_index: usize,
        scroll: usize,
    },
    /// Photo picker shown when paths were not given on the command line
    Picker(PickerState),
    /// Manual API-key entry
    KeyEntry {
        input: String,
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickerState {
    pub files: Vec<PathBuf>,
    pub selected: usize,
    /// Set once the first photo is chosen; then we are picking scrap
    pub broken: Option<PathBuf>,
}

impl PickerState {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            selected: 0,
            broken: None,
        }
    }

    pub fn target_label(&self) -> &'static str {
        if self.broken.is_none() {
            "broken object"
        } else {
            "scrap pile"
        }
    }
}

/// Per-step illustration status shown on the card
#[derive(Debug, Clone, PartialEq)]
pub enum ArtStatus {
    Waiting,
    Rendering,
    Done {
        source: ArtSource,
        path: Option<PathBuf>,
    },
}

/// Per-step narration status
#[derive(Debug, Clone, PartialEq)]
pub enum NarrationStatus {
    None,
    Synthesizing,
    Ready {
        path: PathBuf,
        duration_secs: f64,
    },
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct StepCard {
    pub art: ArtStatus,
    pub narration: NarrationStatus,
}

impl StepCard {
    fn new() -> Self {
        Self {
            art: ArtStatus::Waiting,
            narration: NarrationStatus::None,
        }
    }
}

/// Error banner with the retry / key / demo affordances
#[derive(Debug, Clone)]
pub struct ErrorBanner {
    pub message: String,
    pub kind: Option<FailureKind>,
}

/// Toast notification kind - affects duration and styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Error,
}

impl ToastKind {
    /// Duration in seconds before toast expires
    pub fn duration_secs(&self) -> u64 {
        match self {
            ToastKind::Info => 3,
            ToastKind::Success => 3,
            ToastKind::Error => 8,
        }
    }
}

/// Toast notification
pub struct Toast {
    pub message: String,
    pub created_at: Instant,
    pub kind: ToastKind,
}

impl Toast {
    pub fn new(message: &str) -> Self {
        // Success indicators are checked before error keywords
        let kind = if message.starts_with('+') {
            ToastKind::Success
        } else if message.contains("failed")
            || message.contains("error")
            || message.contains("Error")
            || message.contains("unavailable")
            || message.contains("Invalid")
        {
            ToastKind::Error
        } else {
            ToastKind::Info
        };

        Self {
            message: message.to_string(),
            created_at: Instant::now(),
            kind,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed().as_secs() >= self.kind.duration_secs()
    }
}

/// Main application state for scrapsmith
pub struct App {
    pub config: Config,
    pub settings: PipelineSettings,
    pub demo_mode: bool,

    // Intake
    pub broken_path: Option<PathBuf>,
    pub scrap_path: Option<PathBuf>,

    // The plan and its artifacts
    pub plan: Option<RepairPlan>,
    pub session: Option<Session>,
    pub steps: Vec<StepCard>,
    pub selected_step: usize,

    // Chat. The session is taken while a question is in flight; the
    // pending snapshot keeps the transcript visible meanwhile.
    pub chat: Option<ChatSession>,
    pub chat_pending: Vec<ChatTurn>,
    pub chat_input: String,
    pub chat_scroll: usize,

    // UI state
    pub active_panel: ActivePanel,
    pub input_mode: InputMode,
    pub overlay: Overlay,
    pub toast: Option<Toast>,
    pub error: Option<ErrorBanner>,
    /// Current slide when the full-screen walkthrough is open
    pub slideshow: Option<usize>,
    pub should_quit: bool,

    // Loading state for background tasks
    pub loading: LoadingState,
    pub loading_frame: usize,

    // Totals for the footer
    pub session_tokens: u64,
    pub export_path: Option<PathBuf>,
}

impl App {
    pub fn new(config: Config, settings: PipelineSettings, demo_mode: bool) -> Self {
        Self {
            config,
            settings,
            demo_mode,
            broken_path: None,
            scrap_path: None,
            plan: None,
            session: None,
            steps: Vec::new(),
            selected_step: 0,
            chat: None,
            chat_pending: Vec::new(),
            chat_input: String::new(),
            chat_scroll: 0,
            active_panel: ActivePanel::default(),
            input_mode: InputMode::default(),
            overlay: Overlay::None,
            toast: None,
            error: None,
            slideshow: None,
            should_quit: false,
            loading: LoadingState::None,
            loading_frame: 0,
            session_tokens: 0,
            export_path: None,
        }
    }

    /// Tick the loading animation
    pub fn tick_loading(&mut self) {
        if self.loading.is_loading() {
            self.loading_frame = self.loading_frame.wrapping_add(1);
        }
    }

    pub fn spinner_glyph(&self) -> &'static str {
        SPINNER_FRAMES[self.loading_frame % SPINNER_FRAMES.len()]
    }

    /// Clear expired toast
    pub fn clear_expired_toast(&mut self) {
        if let Some(ref toast) = self.toast {
            if toast.is_expired() {
                self.toast = None;
            }
        }
    }

    pub fn show_toast(&mut self, message: &str) {
        self.toast = Some(Toast::new(message));
    }

    pub fn set_stage(&mut self, stage: PipelineStage) {
        self.loading = match stage {
            PipelineStage::PreparingPhotos => LoadingState::PreparingPhotos,
            PipelineStage::ConsultingAnalyst => LoadingState::ConsultingAnalyst,
        };
    }

    /// A plan arrived: reset the board around it and open the chat.
    pub fn install_plan(&mut self, session: Session, plan: RepairPlan, usage: Option<TokenUsage>) {
        if let Some(u) = usage {
            self.session_tokens += u.total;
        }
        self.steps = plan.steps.iter().map(|_| StepCard::new()).collect();
        self.selected_step = 0;
        self.chat = Some(ChatSession::for_plan(&plan));
        self.chat_pending.clear();
        self.session = Some(session);
        self.plan = Some(plan);
        self.error = None;
        self.export_path = None;
        self.loading = LoadingState::Illustrating;
    }

    pub fn fail_plan(&mut self, message: String, kind: Option<FailureKind>) {
        self.loading = LoadingState::None;
        self.error = Some(ErrorBanner { message, kind });
    }

    pub fn art_started(&mut self, step_index: usize) {
        if let Some(card) = self.steps.get_mut(step_index) {
            card.art = ArtStatus::Rendering;
        }
    }

    pub fn art_done(
        &mut self,
        step_index: usize,
        source: ArtSource,
        failure: Option<FailureKind>,
        path: Option<PathBuf>,
        usage: TokenUsage,
    ) {
        self.session_tokens += usage.total;
        if let Some(card) = self.steps.get_mut(step_index) {
            card.art = ArtStatus::Done { source, path };
        }
        // An invalid key blueprints every remaining step too; surface the
        // banner once so the key affordance is reachable.
        if failure == Some(FailureKind::InvalidKey) && self.error.is_none() {
            self.error = Some(ErrorBanner {
                message: FailureKind::InvalidKey.user_message().to_string(),
                kind: Some(FailureKind::InvalidKey),
            });
        }
        if self.all_art_done() && self.loading == LoadingState::Illustrating {
            self.loading = LoadingState::None;
        }
    }

    pub fn all_art_done(&self) -> bool {
        !self.steps.is_empty()
            && self
                .steps
                .iter()
                .all(|card| matches!(card.art, ArtStatus::Done { .. }))
    }

    pub fn rendered_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|card| matches!(card.art, ArtStatus::Done { .. }))
            .count()
    }

    pub fn blueprint_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|card| {
                matches!(
                    card.art,
                    ArtStatus::Done {
                        source: ArtSource::Blueprint,
                        ..
                    }
                )
            })
            .count()
    }

    pub fn narration_started(&mut self, step_index: usize) {
        if let Some(card) = self.steps.get_mut(step_index) {
            card.narration = NarrationStatus::Synthesizing;
        }
        self.loading = LoadingState::Narrating;
    }

    pub fn narration_done(
        &mut self,
        step_index: usize,
        path: PathBuf,
        duration_secs: f64,
        usage: TokenUsage,
    ) {
        self.session_tokens += usage.total;
        if let Some(card) = self.steps.get_mut(step_index) {
            card.narration = NarrationStatus::Ready {
                path,
                duration_secs,
            };
        }
        self.settle_narration_loading();
    }

    pub fn narration_failed(&mut self, step_index: usize, message: String) {
        if let Some(card) = self.steps.get_mut(step_index) {
            card.narration = NarrationStatus::Unavailable(message);
        }
        self.settle_narration_loading();
    }

    fn settle_narration_loading(&mut self) {
        let any_pending = self
            .steps
            .iter()
            .any(|card| matches!(card.narration, NarrationStatus::Synthesizing));
        if !any_pending && self.loading == LoadingState::Narrating {
            self.loading = if self.all_art_done() {
                LoadingState::None
            } else {
                LoadingState::Illustrating
            };
        }
    }

    /// Take the chat session for a background question. Returns None if
    /// a question is already in flight.
    pub fn begin_chat_wait(&mut self, question: &str) -> Option<ChatSession> {
        let chat = self.chat.take()?;
        self.chat_pending = chat.history.clone();
        self.chat_pending.push(ChatTurn {
            role: ChatRole::User,
            text: question.to_string(),
        });
        self.loading = LoadingState::Answering;
        Some(chat)
    }

    /// Put the chat session back after an answer or a failure.
    pub fn finish_chat(&mut self, chat: ChatSession) {
        self.chat = Some(chat);
        self.chat_pending.clear();
        if self.loading == LoadingState::Answering {
            self.loading = LoadingState::None;
        }
    }

    /// Transcript to draw: live history, or the snapshot while waiting.
    pub fn chat_turns(&self) -> &[ChatTurn] {
        match &self.chat {
            Some(chat) => &chat.history,
            None => &self.chat_pending,
        }
    }

    pub fn chat_waiting(&self) -> bool {
        self.plan.is_some() && self.chat.is_none()
    }

    pub fn step_count(&self) -> usize {
        self.plan.as_ref().map(|p| p.steps.len()).unwrap_or(0)
    }

    pub fn select_next_step(&mut self) {
        let count = self.step_count();
        if count > 0 && self.selected_step + 1 < count {
            self.selected_step += 1;
        }
    }

    pub fn select_prev_step(&mut self) {
        self.selected_step = self.selected_step.saturating_sub(1);
    }

    pub fn open_step_detail(&mut self) {
        if self.selected_step < self.step_count() {
            self.overlay = Overlay::StepDetail {
                step_index: self.selected_step,
                scroll: 0,
            };
        }
    }

    pub fn toggle_slideshow(&mut self) {
        if self.slideshow.is_some() {
            self.slideshow = None;
        } else if self.step_count() > 0 {
            self.slideshow = Some(self.selected_step);
        }
    }

    pub fn slide_next(&mut self) {
        if let Some(current) = self.slideshow {
            if current + 1 < self.step_count() {
                self.slideshow = Some(current + 1);
            }
        }
    }

    pub fn slide_prev(&mut self) {
        if let Some(current) = self.slideshow {
            self.slideshow = Some(current.saturating_sub(1));
        }
    }

    pub fn close_overlay(&mut self) {
        self.overlay = Overlay::None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_plan;

    fn test_app() -> App {
        let config = Config::default();
        let settings = PipelineSettings::from_config(&config);
        App::new(config, settings, false)
    }

    fn app_with_plan() -> (App, tempfile::TempDir) {
        let mut app = test_app();
        let temp = tempfile::tempdir().unwrap();
        let session = Session::create(Some(temp.path()), "t").unwrap();
        app.install_plan(session, demo_plan(), None);
        (app, temp)
    }

    #[test]
    fn test_toast_kind_detection() {
        assert_eq!(Toast::new("+ exported").kind, ToastKind::Success);
        assert_eq!(Toast::new("Chat failed: quota").kind, ToastKind::Error);
        assert_eq!(Toast::new("Narrating step 3").kind, ToastKind::Info);
    }

    #[test]
    fn test_install_plan_builds_cards_and_chat() {
        let (app, _dir) = app_with_plan();
        assert_eq!(app.steps.len(), demo_plan().steps.len());
        assert!(app.chat.is_some());
        assert_eq!(app.loading, LoadingState::Illustrating);
        assert!(app
            .steps
            .iter()
            .all(|card| card.art == ArtStatus::Waiting));
    }

    #[test]
    fn test_art_completion_clears_loading() {
        let (mut app, _dir) = app_with_plan();
        let count = app.steps.len();
        for i in 0..count {
            app.art_done(i, ArtSource::Primary, None, None, TokenUsage::default());
        }
        assert_eq!(app.rendered_count(), count);
        assert_eq!(app.loading, LoadingState::None);
    }

    #[test]
    fn test_invalid_key_during_art_raises_banner() {
        let (mut app, _dir) = app_with_plan();
        app.art_done(
            0,
            ArtSource::Blueprint,
            Some(FailureKind::InvalidKey),
            None,
            TokenUsage::default(),
        );
        let banner = app.error.clone().expect("banner should be raised");
        assert_eq!(banner.kind, Some(FailureKind::InvalidKey));
        assert_eq!(app.blueprint_count(), 1);
    }

    #[test]
    fn test_chat_handoff_keeps_transcript_visible() {
        let (mut app, _dir) = app_with_plan();
        let chat = app.begin_chat_wait("will the glue hold?").unwrap();
        assert!(app.chat_waiting());
        assert_eq!(app.chat_turns().len(), 1);
        assert_eq!(app.chat_turns()[0].text, "will the glue hold?");
        // A second question cannot start while one is in flight
        assert!(app.begin_chat_wait("another?").is_none());

        app.finish_chat(chat);
        assert!(!app.chat_waiting());
        assert_eq!(app.loading, LoadingState::None);
    }

    #[test]
    fn test_step_navigation_clamps() {
        let (mut app, _dir) = app_with_plan();
        app.select_prev_step();
        assert_eq!(app.selected_step, 0);
        let count = app.step_count();
        for _ in 0..count + 5 {
            app.select_next_step();
        }
        assert_eq!(app.selected_step, count - 1);
    }

    #[test]
    fn test_slideshow_navigation() {
        let (mut app, _dir) = app_with_plan();
        app.selected_step = 2;
        app.toggle_slideshow();
        assert_eq!(app.slideshow, Some(2));
        app.slide_next();
        assert_eq!(app.slideshow, Some(3));
        app.slide_prev();
        app.slide_prev();
        app.slide_prev();
        assert_eq!(app.slideshow, Some(0));
        app.toggle_slideshow();
        assert_eq!(app.slideshow, None);
    }
}
