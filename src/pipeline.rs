//! Stage sequencing for a repair session.
//!
//! Everything here runs off the UI thread and reports over the
//! background channel: photo prep, the analyst call, the illustration
//! fan-out, and optional narration. Failures are mapped to user-facing
//! text before they cross the channel; raw detail goes to the session
//! event log instead.

use crate::app::messages::BackgroundMessage;
use crate::config::Config;
use crate::demo;
use crate::gemini::artist::{self, ArtSource, StepArt};
use crate::gemini::narrator::{self, Narration};
use crate::gemini::{analyst, ApiError, FailureKind, GeminiClient, TokenUsage};
use crate::media;
use crate::plan::RepairPlan;
use crate::session::Session;
use futures::future::join_all;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// Launch offset between fan-out siblings, to avoid burst throttling.
pub const FANOUT_STAGGER_MS: u64 = 850;
/// Hosted image/TTS calls allowed in flight at once.
pub const MAX_IN_FLIGHT: usize = 2;

const DEMO_PHOTO_BEAT_MS: u64 = 400;
const DEMO_ANALYST_BEAT_MS: u64 = 900;
const DEMO_STEP_BEAT_MS: u64 = 300;

/// Pre-plan stages, in order. After the plan arrives progress is
/// reported per step instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    PreparingPhotos,
    ConsultingAnalyst,
}

/// Everything the background stages need, resolved once up front from
/// config plus CLI overrides.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub text_model: String,
    pub image_model: String,
    pub image_fallback_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub photo_edge: u32,
    pub jpeg_quality: u8,
    pub out_override: Option<PathBuf>,
    pub narrate: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            image_fallback_model: config.image_fallback_model.clone(),
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
            photo_edge: config.photo_edge_px(),
            jpeg_quality: config.jpeg_quality_pct(),
            out_override: None,
            narrate: config.narrate_by_default,
        }
    }
}

/// Run the full pipeline for one pair of photos. Never returns an
/// error: every failure is sent as a message so the UI (or headless
/// driver) decides what to do with it.
pub async fn run_repair(
    client: GeminiClient,
    settings: PipelineSettings,
    broken_path: PathBuf,
    scrap_path: PathBuf,
    tx: mpsc::Sender<BackgroundMessage>,
) {
    let _ = tx.send(BackgroundMessage::StageChanged(
        PipelineStage::PreparingPhotos,
    ));

    let broken = match media::prepare_photo(&broken_path, settings.photo_edge, settings.jpeg_quality)
    {
        Ok(img) => img,
        Err(e) => {
            let _ = tx.send(BackgroundMessage::PlanFailed {
                message: format!("{:#}", e),
                kind: None,
            });
            return;
        }
    };
    let scrap = match media::prepare_photo(&scrap_path, settings.photo_edge, settings.jpeg_quality) {
        Ok(img) => img,
        Err(e) => {
            let _ = tx.send(BackgroundMessage::PlanFailed {
                message: format!("{:#}", e),
                kind: None,
            });
            return;
        }
    };

    let _ = tx.send(BackgroundMessage::StageChanged(
        PipelineStage::ConsultingAnalyst,
    ));

    let (plan, usage) =
        match analyst::generate_plan(&client, &settings.text_model, &broken, &scrap).await {
            Ok(result) => result,
            Err(e) => {
                let _ = tx.send(BackgroundMessage::PlanFailed {
                    message: failure_text(&e),
                    kind: failure_kind(&e),
                });
                return;
            }
        };

    let session = match open_session(settings.out_override.as_deref(), &plan) {
        Ok(s) => s,
        Err(e) => {
            let _ = tx.send(BackgroundMessage::PlanFailed {
                message: format!("{:#}", e),
                kind: None,
            });
            return;
        }
    };
    let _ = session.log.emit(
        "plan_ready",
        json!({
            "title": plan.title,
            "steps": plan.steps.len(),
            "tokens": usage.total,
        }),
    );

    let _ = tx.send(BackgroundMessage::PlanReady {
        session: session.clone(),
        plan: plan.clone(),
        usage: Some(usage),
    });

    render_all_steps(&client, &settings, &session, &plan, &tx).await;

    if settings.narrate {
        let all: Vec<usize> = (0..plan.steps.len()).collect();
        narrate_steps(&client, &settings, &session, &plan, &all, &tx).await;
    }
}

fn open_session(out_override: Option<&Path>, plan: &RepairPlan) -> anyhow::Result<Session> {
    let session = Session::create(out_override, &plan.title)?;
    session.write_plan(plan)?;
    Ok(session)
}

/// Illustrate every step, two at a time with staggered launches.
/// Completion order is arbitrary; each step always produces exactly one
/// outcome message.
pub async fn render_all_steps(
    client: &GeminiClient,
    settings: &PipelineSettings,
    session: &Session,
    plan: &RepairPlan,
    tx: &mpsc::Sender<BackgroundMessage>,
) {
    let indices: Vec<usize> = (0..plan.steps.len()).collect();
    for window in indices.chunks(MAX_IN_FLIGHT) {
        let batch = window.iter().enumerate().map(|(slot, &step_index)| {
            let client = client.clone();
            let session = session.clone();
            let tx = tx.clone();
            let step = plan.steps[step_index].clone();
            let primary = settings.image_model.clone();
            let fallback = settings.image_fallback_model.clone();
            async move {
                if slot > 0 {
                    tokio::time::sleep(Duration::from_millis(FANOUT_STAGGER_MS * slot as u64))
                        .await;
                }
                let _ = tx.send(BackgroundMessage::StepArtStarted { step_index });
                let art =
                    artist::illustrate_step(&client, &primary, &fallback, step_index, &step).await;
                finish_step_art(&session, art, &tx);
            }
        });
        join_all(batch).await;
    }
}

/// Narrate the given steps with the same stagger policy. A step that
/// fails is marked unavailable on its own; the rest proceed.
pub async fn narrate_steps(
    client: &GeminiClient,
    settings: &PipelineSettings,
    session: &Session,
    plan: &RepairPlan,
    step_indices: &[usize],
    tx: &mpsc::Sender<BackgroundMessage>,
) {
    let wanted: Vec<usize> = step_indices
        .iter()
        .copied()
        .filter(|&i| i < plan.steps.len())
        .collect();
    for window in wanted.chunks(MAX_IN_FLIGHT) {
        let batch = window.iter().enumerate().map(|(slot, &step_index)| {
            let client = client.clone();
            let session = session.clone();
            let tx = tx.clone();
            let step = plan.steps[step_index].clone();
            let model = settings.tts_model.clone();
            let voice = settings.tts_voice.clone();
            async move {
                if slot > 0 {
                    tokio::time::sleep(Duration::from_millis(FANOUT_STAGGER_MS * slot as u64))
                        .await;
                }
                let _ = tx.send(BackgroundMessage::NarrationStarted { step_index });
                match narrator::narrate_step(&client, &model, &voice, step_index, &step).await {
                    Ok(narration) => finish_narration(&session, narration, &tx),
                    Err(e) => {
                        let message = failure_text(&e);
                        let _ = session.log.emit(
                            "narration_failed",
                            json!({ "step": step_index + 1, "detail": message }),
                        );
                        let _ = tx.send(BackgroundMessage::NarrationFailed {
                            step_index,
                            message,
                        });
                    }
                }
            }
        });
        join_all(batch).await;
    }
}

/// Walk the canned workshop through the normal message sequence with
/// short beats, so the UI behaves exactly as it does online.
pub async fn run_demo(out_override: Option<PathBuf>, tx: mpsc::Sender<BackgroundMessage>) {
    let _ = tx.send(BackgroundMessage::StageChanged(
        PipelineStage::PreparingPhotos,
    ));
    tokio::time::sleep(Duration::from_millis(DEMO_PHOTO_BEAT_MS)).await;
    let _ = tx.send(BackgroundMessage::StageChanged(
        PipelineStage::ConsultingAnalyst,
    ));
    tokio::time::sleep(Duration::from_millis(DEMO_ANALYST_BEAT_MS)).await;

    let plan = demo::demo_plan();
    let session = match open_session(out_override.as_deref(), &plan) {
        Ok(s) => s,
        Err(e) => {
            let _ = tx.send(BackgroundMessage::PlanFailed {
                message: format!("{:#}", e),
                kind: None,
            });
            return;
        }
    };
    let _ = session.log.emit(
        "plan_ready",
        json!({ "title": plan.title, "steps": plan.steps.len(), "demo": true }),
    );
    let _ = tx.send(BackgroundMessage::PlanReady {
        session: session.clone(),
        plan: plan.clone(),
        usage: None,
    });

    for (i, step) in plan.steps.iter().enumerate() {
        let _ = tx.send(BackgroundMessage::StepArtStarted { step_index: i });
        tokio::time::sleep(Duration::from_millis(DEMO_STEP_BEAT_MS)).await;
        let art = StepArt {
            step_index: i,
            mime: "image/png".to_string(),
            data: demo::blueprint_png(i, &step.title),
            source: ArtSource::Blueprint,
            failure: None,
            notes: Vec::new(),
            usage: TokenUsage::default(),
        };
        finish_step_art(&session, art, &tx);
    }
}

fn finish_step_art(session: &Session, art: StepArt, tx: &mpsc::Sender<BackgroundMessage>) {
    let path = session.write_step_image(art.step_index, &art.data).ok();
    let _ = session.log.emit(
        "step_art",
        json!({
            "step": art.step_index + 1,
            "source": art.source.label(),
            "failure": art.failure.map(|k| format!("{:?}", k)),
            "notes": art.notes,
            "written": path.is_some(),
        }),
    );
    let _ = tx.send(BackgroundMessage::StepArtReady {
        step_index: art.step_index,
        source: art.source,
        failure: art.failure,
        path,
        usage: art.usage,
    });
}

fn finish_narration(session: &Session, narration: Narration, tx: &mpsc::Sender<BackgroundMessage>) {
    let step_index = narration.step_index;
    let duration_secs = narration.duration_secs();
    match session.write_narration(step_index, &narration.samples, narration.sample_rate) {
        Ok(path) => {
            let _ = session.log.emit(
                "narration",
                json!({
                    "step": step_index + 1,
                    "seconds": (duration_secs * 10.0).round() / 10.0,
                }),
            );
            let _ = tx.send(BackgroundMessage::NarrationReady {
                step_index,
                path,
                duration_secs,
                usage: narration.usage,
            });
        }
        Err(e) => {
            let message = format!("{:#}", e);
            let _ = session.log.emit(
                "narration_failed",
                json!({ "step": step_index + 1, "detail": message }),
            );
            let _ = tx.send(BackgroundMessage::NarrationFailed {
                step_index,
                message,
            });
        }
    }
}

/// Hosted-call errors already carry user-facing wording; anything else
/// gets its full context chain.
pub fn failure_text(e: &anyhow::Error) -> String {
    match e.downcast_ref::<ApiError>() {
        Some(err) => err.to_string(),
        None => format!("{:#}", e),
    }
}

pub fn failure_kind(e: &anyhow::Error) -> Option<FailureKind> {
    e.downcast_ref::<ApiError>().map(|err| err.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::fs;

    #[test]
    fn test_failure_text_prefers_mapped_wording() {
        let api: anyhow::Error = ApiError::new(FailureKind::QuotaExceeded, "429 body").into();
        assert_eq!(failure_text(&api), FailureKind::QuotaExceeded.user_message());
        assert_eq!(failure_kind(&api), Some(FailureKind::QuotaExceeded));

        let plain = anyhow!("base").context("photo went missing");
        assert!(failure_text(&plain).contains("photo went missing"));
        assert_eq!(failure_kind(&plain), None);
    }

    #[test]
    fn test_settings_from_config_defaults() {
        let settings = PipelineSettings::from_config(&Config::default());
        assert_eq!(settings.text_model, "gemini-2.5-flash");
        assert_eq!(settings.photo_edge, 1024);
        assert!(settings.out_override.is_none());
        assert!(!settings.narrate);
    }

    #[test]
    fn test_finish_step_art_writes_and_reports() {
        let temp = tempfile::tempdir().unwrap();
        let session = Session::create(Some(temp.path()), "t").unwrap();
        let (tx, rx) = mpsc::channel();

        let art = StepArt {
            step_index: 2,
            mime: "image/png".to_string(),
            data: demo::blueprint_png(2, "brace"),
            source: ArtSource::Blueprint,
            failure: Some(FailureKind::Blocked),
            notes: vec!["studio rung failed".to_string()],
            usage: TokenUsage::default(),
        };
        finish_step_art(&session, art, &tx);

        assert!(session.image_path(2).exists());
        match rx.try_recv().unwrap() {
            BackgroundMessage::StepArtReady {
                step_index,
                source,
                failure,
                path,
                ..
            } => {
                assert_eq!(step_index, 2);
                assert_eq!(source, ArtSource::Blueprint);
                assert_eq!(failure, Some(FailureKind::Blocked));
                assert_eq!(path.unwrap(), session.image_path(2));
            }
            _ => panic!("expected StepArtReady"),
        }

        let log = fs::read_to_string(session.dir.join("events.jsonl")).unwrap();
        assert!(log.contains("\"step_art\""));
        assert!(log.contains("studio rung failed"));
    }

    #[test]
    fn test_demo_walk_sends_one_outcome_per_step() {
        let temp = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(run_demo(Some(temp.path().to_path_buf()), tx));

        let messages: Vec<BackgroundMessage> = rx.try_iter().collect();
        let step_count = demo::demo_plan().steps.len();

        let plans = messages
            .iter()
            .filter(|m| matches!(m, BackgroundMessage::PlanReady { .. }))
            .count();
        assert_eq!(plans, 1);

        let outcomes: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                BackgroundMessage::StepArtReady {
                    step_index,
                    source,
                    failure,
                    ..
                } => Some((*step_index, *source, *failure)),
                _ => None,
            })
            .collect();
        assert_eq!(outcomes.len(), step_count);
        for (i, source, failure) in outcomes {
            assert_eq!(source, ArtSource::Blueprint);
            assert_eq!(failure, None);
            assert!(session_file(temp.path(), i).exists());
        }
        assert!(temp.path().join("plan.json").exists());
    }

    fn session_file(dir: &Path, step_index: usize) -> PathBuf {
        dir.join(format!("step-{:02}.png", step_index + 1))
    }
}
