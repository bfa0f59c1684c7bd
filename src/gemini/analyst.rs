//! Brain 1: one multimodal call that turns two photos into a repair plan.

use super::{block_reason, extract_text, extract_usage, ApiError, FailureKind, GeminiClient, TokenUsage};
use crate::media::InlineImage;
use crate::plan::{parse_plan, RepairPlan};
use crate::prompts;
use serde_json::{json, Value};

/// Ask the analyst model for a structured plan from the two photos.
pub async fn generate_plan(
    client: &GeminiClient,
    model: &str,
    broken: &InlineImage,
    scrap: &InlineImage,
) -> anyhow::Result<(RepairPlan, TokenUsage)> {
    let payload = request_payload(broken, scrap);
    let response = client.generate(model, &payload).await?;
    plan_from_response(&response)
}

fn request_payload(broken: &InlineImage, scrap: &InlineImage) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{"text": prompts::PLANNER_SYSTEM}]
        },
        "contents": [{
            "role": "user",
            "parts": [
                broken.to_part(),
                scrap.to_part(),
                {"text": prompts::PLANNER_TASK}
            ]
        }],
        "generationConfig": {
            "temperature": 0.4,
            "responseMimeType": "application/json",
            "maxOutputTokens": 8192
        }
    })
}

fn plan_from_response(response: &Value) -> anyhow::Result<(RepairPlan, TokenUsage)> {
    if let Some(reason) = block_reason(response) {
        return Err(ApiError::new(FailureKind::Blocked, reason).into());
    }

    let text = extract_text(response);
    if text.trim().is_empty() {
        return Err(ApiError::new(FailureKind::Malformed, "empty analyst response").into());
    }

    let plan = parse_plan(&text)?;
    Ok((plan, extract_usage(response)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_photo() -> InlineImage {
        InlineImage {
            mime: "image/jpeg".to_string(),
            data: vec![0xFF, 0xD8, 0xFF],
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload = request_payload(&test_photo(), &test_photo());

        assert_eq!(
            payload["systemInstruction"]["parts"][0]["text"],
            prompts::PLANNER_SYSTEM
        );
        let parts = payload["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[2]["text"], prompts::PLANNER_TASK);
        assert_eq!(
            payload["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_plan_from_response() {
        let plan_text = r#"{"title": "Bench Fix", "summary": "s", "damage_report": "d",
            "scrap_inventory": "i", "steps": [
                {"title": "Clamp it", "description": "Hold the crack closed.", "action": "fasten"}
            ]}"#;
        let response = json!({
            "candidates": [{"content": {"parts": [{"text": plan_text}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 900, "candidatesTokenCount": 210, "totalTokenCount": 1110}
        });

        let (plan, usage) = plan_from_response(&response).unwrap();
        assert_eq!(plan.title, "Bench Fix");
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(usage.total, 1110);
    }

    #[test]
    fn test_blocked_response_surfaces_as_blocked() {
        let response = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = plan_from_response(&response).unwrap_err();
        let api = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api.kind, FailureKind::Blocked);
    }

    #[test]
    fn test_empty_response_is_malformed() {
        let response = json!({"candidates": [{"content": {"parts": []}}]});
        let err = plan_from_response(&response).unwrap_err();
        let api = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api.kind, FailureKind::Malformed);
    }
}
