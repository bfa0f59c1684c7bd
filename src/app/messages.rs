use crate::gemini::artist::ArtSource;
use crate::gemini::chat::ChatSession;
use crate::gemini::{FailureKind, TokenUsage};
use crate::pipeline::PipelineStage;
use crate::plan::RepairPlan;
use crate::session::Session;
use std::path::PathBuf;

/// Messages from background tasks to the main UI thread
pub enum BackgroundMessage {
    /// Pipeline moved into a pre-plan stage (photo prep, analyst call)
    StageChanged(PipelineStage),
    /// Plan arrived and the session directory exists
    PlanReady {
        session: Session,
        plan: RepairPlan,
        usage: Option<TokenUsage>,
    },
    PlanFailed {
        message: String,
        kind: Option<FailureKind>,
    },
    StepArtStarted {
        step_index: usize,
    },
    /// One step's illustration outcome. Always arrives exactly once per
    /// step; a blueprint stand-in carries the failure that exhausted the
    /// model chain.
    StepArtReady {
        step_index: usize,
        source: ArtSource,
        failure: Option<FailureKind>,
        path: Option<PathBuf>,
        usage: TokenUsage,
    },
    NarrationStarted {
        step_index: usize,
    },
    NarrationReady {
        step_index: usize,
        path: PathBuf,
        duration_secs: f64,
        usage: TokenUsage,
    },
    NarrationFailed {
        step_index: usize,
        message: String,
    },
    /// Answer to a chat question. The session travels with the message:
    /// the app hands it to the background task and gets it back here.
    ChatAnswer {
        chat: ChatSession,
        usage: TokenUsage,
    },
    ChatFailed {
        chat: ChatSession,
        message: String,
        kind: Option<FailureKind>,
    },
    ExportDone(PathBuf),
    ExportFailed(String),
    /// Generic error (background task panic, odd jobs)
    Error(String),
}
