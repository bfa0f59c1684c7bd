//! Background task handling.
//!
//! Channel sends in spawned tasks use `let _ =`: when the receiver is
//! gone the app is shutting down and there is no one left to tell.

use crate::app::messages::BackgroundMessage;
use crate::app::RuntimeContext;
use crate::gemini::FailureKind;
use crate::pipeline;
use crate::ui::{App, ErrorBanner, Overlay};
use crate::util::truncate;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc;

pub fn drain_messages(app: &mut App, rx: &mpsc::Receiver<BackgroundMessage>) {
    while let Ok(msg) = rx.try_recv() {
        match msg {
            BackgroundMessage::StageChanged(stage) => {
                app.set_stage(stage);
            }
            BackgroundMessage::PlanReady {
                session,
                plan,
                usage,
            } => {
                let count = plan.steps.len();
                app.install_plan(session, plan, usage);
                app.show_toast(&format!("+ plan ready: {} steps", count));
            }
            BackgroundMessage::PlanFailed { message, kind } => {
                app.fail_plan(message, kind);
            }
            BackgroundMessage::StepArtStarted { step_index } => {
                app.art_started(step_index);
            }
            BackgroundMessage::StepArtReady {
                step_index,
                source,
                failure,
                path,
                usage,
            } => {
                app.art_done(step_index, source, failure, path, usage);
            }
            BackgroundMessage::NarrationStarted { step_index } => {
                app.narration_started(step_index);
            }
            BackgroundMessage::NarrationReady {
                step_index,
                path,
                duration_secs,
                usage,
            } => {
                app.narration_done(step_index, path, duration_secs, usage);
            }
            BackgroundMessage::NarrationFailed {
                step_index,
                message,
            } => {
                app.show_toast(&format!(
                    "narration unavailable for step {}",
                    step_index + 1
                ));
                app.narration_failed(step_index, message);
            }
            BackgroundMessage::ChatAnswer { chat, usage } => {
                app.session_tokens += usage.total;
                app.finish_chat(chat);
            }
            BackgroundMessage::ChatFailed {
                chat,
                message,
                kind,
            } => {
                app.finish_chat(chat);
                app.show_toast(&format!("chat failed: {}", truncate(&message, 80)));
                if kind == Some(FailureKind::InvalidKey) && app.error.is_none() {
                    app.error = Some(ErrorBanner {
                        message,
                        kind,
                    });
                }
            }
            BackgroundMessage::ExportDone(path) => {
                app.export_path = Some(path.clone());
                app.show_toast(&format!("+ exported {}", path.display()));
            }
            BackgroundMessage::ExportFailed(message) => {
                app.show_toast(&format!("export failed: {}", truncate(&message, 80)));
            }
            BackgroundMessage::Error(message) => {
                app.show_toast(&truncate(&message, 100));
            }
        }
    }
}

/// Kick off (or re-kick) the repair pipeline from whatever photos and
/// client are on hand. Used at startup, after the picker, and for retry.
pub fn spawn_pipeline(app: &mut App, ctx: &RuntimeContext) {
    if app.demo_mode {
        app.error = None;
        spawn_pipeline_demo(app, ctx.tx);
        return;
    }

    let (Some(broken), Some(scrap)) = (app.broken_path.clone(), app.scrap_path.clone()) else {
        return;
    };
    let Some(client) = &ctx.client else {
        app.overlay = Overlay::KeyEntry {
            input: String::new(),
            error: Some("No API key saved yet. Paste one to continue.".to_string()),
        };
        return;
    };

    app.error = None;
    app.set_stage(crate::pipeline::PipelineStage::PreparingPhotos);
    spawn_background(
        ctx.tx.clone(),
        "repair_pipeline",
        pipeline::run_repair(
            client.clone(),
            app.settings.clone(),
            broken,
            scrap,
            ctx.tx.clone(),
        ),
    );
}

pub fn spawn_pipeline_demo(app: &mut App, tx: &mpsc::Sender<BackgroundMessage>) {
    app.set_stage(crate::pipeline::PipelineStage::PreparingPhotos);
    spawn_background(
        tx.clone(),
        "demo_pipeline",
        pipeline::run_demo(app.settings.out_override.clone(), tx.clone()),
    );
}

/// Spawn a background task that reports panics through the channel
/// instead of dying silently.
pub fn spawn_background<F>(tx: mpsc::Sender<BackgroundMessage>, task_name: &'static str, fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
            let detail = if let Some(s) = panic.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            };
            let _ = tx.send(BackgroundMessage::Error(format!(
                "Background task '{}' crashed unexpectedly: {}",
                task_name, detail
            )));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::demo;
    use crate::gemini::TokenUsage;
    use crate::pipeline::{PipelineSettings, PipelineStage};
    use crate::session::Session;
    use crate::ui::LoadingState;

    fn test_app() -> App {
        let config = Config::default();
        let settings = PipelineSettings::from_config(&config);
        App::new(config, settings, false)
    }

    #[test]
    fn test_drain_applies_stage_and_plan() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app();
        let (tx, rx) = mpsc::channel();

        tx.send(BackgroundMessage::StageChanged(
            PipelineStage::ConsultingAnalyst,
        ))
        .unwrap();
        let plan = demo::demo_plan();
        let session = Session::create(Some(dir.path()), &plan.title).unwrap();
        tx.send(BackgroundMessage::PlanReady {
            session,
            plan,
            usage: Some(TokenUsage {
                prompt: 10,
                output: 5,
                total: 15,
            }),
        })
        .unwrap();

        drain_messages(&mut app, &rx);

        assert!(app.plan.is_some());
        assert_eq!(app.loading, LoadingState::Illustrating);
        assert_eq!(app.session_tokens, 15);
        let toast = app.toast.as_ref().unwrap();
        assert!(toast.message.contains("plan ready"));
    }

    #[test]
    fn test_drain_reports_plan_failure() {
        let mut app = test_app();
        let (tx, rx) = mpsc::channel();

        tx.send(BackgroundMessage::PlanFailed {
            message: "Could not reach Gemini. Check your connection and retry.".to_string(),
            kind: Some(FailureKind::Network),
        })
        .unwrap();

        drain_messages(&mut app, &rx);

        let banner = app.error.as_ref().unwrap();
        assert_eq!(banner.kind, Some(FailureKind::Network));
        assert_eq!(app.loading, LoadingState::None);
    }

    #[test]
    fn test_drain_export_done_sets_path() {
        let mut app = test_app();
        let (tx, rx) = mpsc::channel();

        tx.send(BackgroundMessage::ExportDone("plans/export.html".into()))
            .unwrap();
        drain_messages(&mut app, &rx);

        assert_eq!(
            app.export_path.as_deref(),
            Some(std::path::Path::new("plans/export.html"))
        );
        assert!(app.toast.as_ref().unwrap().message.contains("exported"));
    }
}
