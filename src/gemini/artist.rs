//! Brain 2: per-step illustrations.
//!
//! Every step gets exactly one image outcome. The chain walks: primary
//! model with the styled, scrubbed prompt; primary again with a stripped
//! neutral prompt; the fallback model; and finally a locally drawn
//! blueprint placeholder, which cannot fail. A safety refusal advances
//! the chain immediately; quota and transport problems get the client's
//! normal retry policy first.

use super::{
    block_reason, extract_inline_blobs, extract_usage, ApiError, FailureKind, GeminiClient,
    InlineBlob, TokenUsage,
};
use crate::demo;
use crate::plan::RepairStep;
use crate::prompts;
use crate::scrub::scrub_prompt;
use serde_json::{json, Value};

/// Which rung of the chain produced a step's image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtSource {
    Primary,
    Simplified,
    FallbackModel,
    Blueprint,
}

impl ArtSource {
    pub fn label(&self) -> &'static str {
        match self {
            ArtSource::Primary => "studio",
            ArtSource::Simplified => "simplified",
            ArtSource::FallbackModel => "fallback model",
            ArtSource::Blueprint => "blueprint",
        }
    }
}

/// One step's illustration outcome.
#[derive(Debug, Clone)]
pub struct StepArt {
    pub step_index: usize,
    pub mime: String,
    pub data: Vec<u8>,
    pub source: ArtSource,
    /// Set when the model path was exhausted and the blueprint stood in.
    pub failure: Option<FailureKind>,
    /// Rung-by-rung trouble, for the session log.
    pub notes: Vec<String>,
    pub usage: TokenUsage,
}

/// Walk the chain for one step. Never errors: the blueprint rung is
/// terminal.
pub async fn illustrate_step(
    client: &GeminiClient,
    primary_model: &str,
    fallback_model: &str,
    step_index: usize,
    step: &RepairStep,
) -> StepArt {
    let mut usage = TokenUsage::default();
    let mut notes = Vec::new();
    let mut last_kind = None;

    let scene = scrub_prompt(&step.image_prompt);
    let styled = prompts::styled_image_prompt(&scene);
    let simple = prompts::simplified_image_prompt(step_index + 1, &step.title);

    let rungs: [(ArtSource, &str, &str, bool); 3] = [
        (ArtSource::Primary, primary_model, styled.as_str(), false),
        (ArtSource::Simplified, primary_model, simple.as_str(), false),
        (ArtSource::FallbackModel, fallback_model, simple.as_str(), true),
    ];

    for (source, model, prompt, with_text) in rungs {
        match attempt(client, model, prompt, with_text, &mut usage).await {
            Ok(blob) => {
                return StepArt {
                    step_index,
                    mime: blob.mime,
                    data: blob.data,
                    source,
                    failure: None,
                    notes,
                    usage,
                };
            }
            Err(err) => {
                notes.push(format!(
                    "{} rung failed ({:?}): {}",
                    source.label(),
                    err.kind,
                    err.detail
                ));
                last_kind = Some(err.kind);
                // A rejected key fails every rung the same way
                if err.kind == FailureKind::InvalidKey {
                    break;
                }
            }
        }
    }

    StepArt {
        step_index,
        mime: "image/png".to_string(),
        data: demo::blueprint_png(step_index, &step.title),
        source: ArtSource::Blueprint,
        failure: last_kind,
        notes,
        usage,
    }
}

async fn attempt(
    client: &GeminiClient,
    model: &str,
    prompt: &str,
    with_text_modality: bool,
    usage: &mut TokenUsage,
) -> Result<InlineBlob, ApiError> {
    let payload = image_payload(prompt, with_text_modality);
    let response = client.generate(model, &payload).await?;
    usage.add(extract_usage(&response));
    image_from_response(&response)
}

fn image_payload(prompt: &str, with_text_modality: bool) -> Value {
    // Some image models reject requests unless TEXT rides along
    let modalities = if with_text_modality {
        json!(["TEXT", "IMAGE"])
    } else {
        json!(["IMAGE"])
    };

    json!({
        "contents": [{
            "role": "user",
            "parts": [{"text": prompt}]
        }],
        "generationConfig": {
            "candidateCount": 1,
            "responseModalities": modalities
        },
        "safetySettings": relaxed_safety_settings()
    })
}

// Text-safety thresholds are relaxed so the separate image-safety system
// is the only gate left; that one only answers to prompt wording.
fn relaxed_safety_settings() -> Vec<Value> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| {
        json!({
            "category": category,
            "threshold": "OFF",
        })
    })
    .collect()
}

fn image_from_response(response: &Value) -> Result<InlineBlob, ApiError> {
    if let Some(reason) = block_reason(response) {
        return Err(ApiError::new(FailureKind::Blocked, reason));
    }

    extract_inline_blobs(response)
        .into_iter()
        .find(|blob| blob.mime.starts_with("image/"))
        .ok_or_else(|| ApiError::new(FailureKind::Malformed, "no image part in response"))
}
