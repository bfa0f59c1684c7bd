//! Per-step narration: a TTS call that answers with raw PCM.

use super::{
    block_reason, extract_inline_blobs, extract_usage, ApiError, FailureKind, GeminiClient,
    TokenUsage,
};
use crate::audio;
use crate::plan::RepairStep;
use crate::prompts;
use serde_json::{json, Value};

/// Decoded narration audio for one step, ready to wrap in a WAV.
#[derive(Debug, Clone)]
pub struct Narration {
    pub step_index: usize,
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub usage: TokenUsage,
}

impl Narration {
    pub fn duration_secs(&self) -> f64 {
        audio::duration_secs(self.samples.len(), self.sample_rate)
    }
}

/// Synthesize spoken narration for one step.
pub async fn narrate_step(
    client: &GeminiClient,
    model: &str,
    voice: &str,
    step_index: usize,
    step: &RepairStep,
) -> anyhow::Result<Narration> {
    let script = prompts::narration_script(
        step_index + 1,
        &step.title,
        &step.description,
        &step.materials,
    );
    let payload = tts_payload(&script, voice);
    let response = client.generate(model, &payload).await?;
    narration_from_response(&response, step_index)
}

fn tts_payload(script: &str, voice: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{"text": script}]
        }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": {"voiceName": voice}
                }
            }
        }
    })
}

fn narration_from_response(response: &Value, step_index: usize) -> anyhow::Result<Narration> {
    if let Some(reason) = block_reason(response) {
        return Err(ApiError::new(FailureKind::Blocked, reason).into());
    }

    let blob = extract_inline_blobs(response)
        .into_iter()
        .find(|blob| blob.mime.starts_with("audio/"))
        .ok_or_else(|| ApiError::new(FailureKind::Malformed, "no audio part in response"))?;

    let sample_rate = audio::parse_l16_rate(&blob.mime);
    let samples = audio::pcm_to_samples(&blob.data);
    if samples.is_empty() {
        return Err(ApiError::new(FailureKind::Malformed, "empty audio payload").into());
    }

    Ok(Narration {
        step_index,
        samples,
        sample_rate,
        usage: extract_usage(response),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    #[test]
    fn test_tts_payload_shape() {
        let payload = tts_payload("Step 1. Clean the split.", "Charon");
        assert_eq!(payload["generationConfig"]["responseModalities"], json!(["AUDIO"]));
        assert_eq!(
            payload["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Charon"
        );
        assert_eq!(payload["contents"][0]["parts"][0]["text"], "Step 1. Clean the split.");
    }

    #[test]
    fn test_narration_from_response() {
        // Two little-endian samples: 1 and -2
        let pcm = BASE64.encode([0x01, 0x00, 0xFE, 0xFF]);
        let response = json!({
            "candidates": [{
                "content": {"parts": [{
                    "inlineData": {"mimeType": "audio/L16;codec=pcm;rate=24000", "data": pcm}
                }]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 40, "candidatesTokenCount": 0, "totalTokenCount": 40}
        });

        let narration = narration_from_response(&response, 3).unwrap();
        assert_eq!(narration.step_index, 3);
        assert_eq!(narration.sample_rate, 24_000);
        assert_eq!(narration.samples, vec![1, -2]);
        assert_eq!(narration.usage.total, 40);
    }

    #[test]
    fn test_missing_audio_part() {
        let response = json!({
            "candidates": [{"content": {"parts": [{"text": "cannot speak"}]}, "finishReason": "STOP"}]
        });
        let err = narration_from_response(&response, 0).unwrap_err();
        let api = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api.kind, FailureKind::Malformed);
    }

    #[test]
    fn test_empty_audio_payload() {
        // A single stray byte decodes to zero whole samples
        let pcm = BASE64.encode([0x7F]);
        let response = json!({
            "candidates": [{
                "content": {"parts": [{
                    "inlineData": {"mimeType": "audio/L16;rate=24000", "data": pcm}
                }]},
                "finishReason": "STOP"
            }]
        });
        let err = narration_from_response(&response, 0).unwrap_err();
        let api = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api.kind, FailureKind::Malformed);
        assert!(api.detail.contains("empty audio"));
    }
}
