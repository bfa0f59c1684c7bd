//! Shared Gemini plumbing: endpoint construction, auth, retry with
//! backoff, failure classification, and response part extraction.
//!
//! The per-call payload shapes live with their callers (analyst, artist,
//! narrator, chat); this module only knows how to move JSON to and from
//! `models/{model}:generateContent` and how to turn what comes back into
//! something the UI can act on.

pub mod analyst;
pub mod artist;
pub mod chat;
pub mod narrator;

use crate::util::truncate;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Rate limit retry configuration
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 2000; // 2 seconds
const BACKOFF_MULTIPLIER: u64 = 2; // Exponential backoff

/// How a hosted call failed, reduced to what the UI can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidKey,
    QuotaExceeded,
    ServerUnavailable,
    Network,
    Blocked,
    Malformed,
}

impl FailureKind {
    /// The sentence shown to the user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::InvalidKey => {
                "Invalid API key. Run 'scrapsmith --setup' or use the in-app key entry to update it."
            }
            FailureKind::QuotaExceeded => {
                "Gemini quota exceeded. Wait a few minutes and retry, or switch to the demo workshop."
            }
            FailureKind::ServerUnavailable => {
                "Gemini server error. The service may be temporarily unavailable."
            }
            FailureKind::Network => "Could not reach Gemini. Check your connection and retry.",
            FailureKind::Blocked => "The request was declined by the provider's safety filters.",
            FailureKind::Malformed => "The response could not be read. Try regenerating.",
        }
    }

    /// Whether the call is worth repeating without the user changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureKind::QuotaExceeded | FailureKind::ServerUnavailable | FailureKind::Network
        )
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .kind.user_message())]
pub struct ApiError {
    pub kind: FailureKind,
    /// Truncated raw body or transport error, for the session log.
    pub detail: String,
}

impl ApiError {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: truncate(&detail.into(), 200),
        }
    }
}

/// Token counts reported by the API, accumulated into session totals.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub output: u64,
    pub total: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt += other.prompt;
        self.output += other.output;
        self.total += other.total;
    }
}

/// A decoded `inlineData` response part (image bytes, PCM audio).
#[derive(Debug, Clone)]
pub struct InlineBlob {
    pub mime: String,
    pub data: Vec<u8>,
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key,
        }
    }

    #[cfg(test)]
    fn with_base(api_key: String, api_base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
            api_key,
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    /// POST a generateContent payload with retry and backoff. Quota,
    /// server, and transport failures retry up to MAX_RETRIES; everything
    /// else returns immediately with a classified error.
    pub async fn generate(&self, model: &str, payload: &Value) -> Result<Value, ApiError> {
        let url = self.endpoint_for_model(model);
        let mut retry_count: u32 = 0;

        loop {
            let sent = self
                .http
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .json(payload)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(err) => {
                    if is_retryable_transport_error(&err) && retry_count < MAX_RETRIES {
                        retry_count += 1;
                        tokio::time::sleep(Duration::from_secs(backoff_secs(retry_count))).await;
                        continue;
                    }
                    return Err(ApiError::new(FailureKind::Network, err.to_string()));
                }
            };

            let status = response.status();
            let text = match response.text().await {
                Ok(text) => text,
                Err(err) => {
                    if retry_count < MAX_RETRIES {
                        retry_count += 1;
                        tokio::time::sleep(Duration::from_secs(backoff_secs(retry_count))).await;
                        continue;
                    }
                    return Err(ApiError::new(FailureKind::Network, err.to_string()));
                }
            };

            if status.is_success() {
                return serde_json::from_str(&text)
                    .map_err(|e| ApiError::new(FailureKind::Malformed, format!("{}: {}", e, text)));
            }

            let kind = classify_status(status.as_u16(), &text);
            if kind.is_retryable() && retry_count < MAX_RETRIES {
                retry_count += 1;
                let wait = parse_retry_delay(&text).unwrap_or_else(|| backoff_secs(retry_count));
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            return Err(ApiError::new(kind, text));
        }
    }
}

fn backoff_secs(retry_count: u32) -> u64 {
    (INITIAL_BACKOFF_MS * BACKOFF_MULTIPLIER.pow(retry_count.saturating_sub(1))) / 1000
}

fn is_retryable_transport_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Map an HTTP status (plus body, for ambiguous 400s) to a failure kind.
fn classify_status(status: u16, body: &str) -> FailureKind {
    match status {
        400 => {
            // Gemini reports bad keys as 400 INVALID_ARGUMENT
            if body.contains("API key not valid") || body.contains("API_KEY_INVALID") {
                FailureKind::InvalidKey
            } else {
                FailureKind::Malformed
            }
        }
        401 | 403 => FailureKind::InvalidKey,
        429 => FailureKind::QuotaExceeded,
        500..=599 => FailureKind::ServerUnavailable,
        _ => FailureKind::Malformed,
    }
}

/// Extract a retry hint from a 429 body. Gemini embeds
/// `"retryDelay": "7s"` in error details; fall back to scanning for
/// "retry ... N seconds" phrasing.
fn parse_retry_delay(text: &str) -> Option<u64> {
    if let Some(pos) = text.find("retryDelay") {
        let after = &text[pos..];
        let digits: String = after
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(secs) = digits.parse::<u64>() {
            if secs > 0 && secs < 300 {
                return Some(secs);
            }
        }
    }

    let text_lower = text.to_lowercase();
    if let Some(pos) = text_lower.find("retry") {
        let after_retry = &text_lower[pos..];
        for word in after_retry.split_whitespace().skip(1).take(5) {
            if let Ok(secs) = word.trim_matches(|c: char| !c.is_numeric()).parse::<u64>() {
                if secs > 0 && secs < 300 {
                    return Some(secs);
                }
            }
        }
    }
    None
}

/// Why a response was refused, if it was. Checks prompt feedback first,
/// then the first candidate's finish reason.
pub fn block_reason(response: &Value) -> Option<String> {
    if let Some(reason) = response
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(Value::as_str)
    {
        return Some(reason.to_string());
    }

    let finish = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("finishReason"))
        .and_then(Value::as_str)?;

    match finish {
        "SAFETY" | "IMAGE_SAFETY" | "PROHIBITED_CONTENT" | "RECITATION" | "BLOCKLIST" => {
            Some(finish.to_string())
        }
        _ => None,
    }
}

/// Concatenated text parts of the first candidate.
pub fn extract_text(response: &Value) -> String {
    let mut out = String::new();
    let parts = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array);

    if let Some(parts) = parts {
        for part in parts {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
        }
    }
    out
}

/// All decodable `inlineData` parts across candidates. Both camelCase and
/// snake_case spellings show up in the wild.
pub fn extract_inline_blobs(response: &Value) -> Vec<InlineBlob> {
    let mut blobs = Vec::new();
    let candidates = response
        .get("candidates")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    for candidate in candidates {
        let parts = candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for part in parts {
            let inline = part
                .get("inlineData")
                .or_else(|| part.get("inline_data"));
            let Some(inline) = inline else { continue };

            let mime = inline
                .get("mimeType")
                .or_else(|| inline.get("mime_type"))
                .and_then(Value::as_str)
                .unwrap_or("application/octet-stream")
                .to_string();

            let Some(data) = inline.get("data").and_then(Value::as_str) else {
                continue;
            };
            if let Ok(bytes) = BASE64.decode(data) {
                if !bytes.is_empty() {
                    blobs.push(InlineBlob { mime, data: bytes });
                }
            }
        }
    }
    blobs
}

/// Token counts from `usageMetadata`, zeroed when absent.
pub fn extract_usage(response: &Value) -> TokenUsage {
    let meta = response.get("usageMetadata");
    let count = |key: &str| -> u64 {
        meta.and_then(|m| m.get(key))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    TokenUsage {
        prompt: count("promptTokenCount"),
        output: count("candidatesTokenCount"),
        total: count("totalTokenCount"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_for_model() {
        let client = GeminiClient::with_base("k".into(), "https://example.test/v1beta".into());
        assert_eq!(
            client.endpoint_for_model("gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(
            classify_status(400, r#"{"error": {"message": "API key not valid. Please pass a valid API key."}}"#),
            FailureKind::InvalidKey
        );
        assert_eq!(classify_status(400, "bad request shape"), FailureKind::Malformed);
        assert_eq!(classify_status(403, ""), FailureKind::InvalidKey);
        assert_eq!(classify_status(429, ""), FailureKind::QuotaExceeded);
        assert_eq!(classify_status(503, ""), FailureKind::ServerUnavailable);
        assert_eq!(classify_status(404, "model not found"), FailureKind::Malformed);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(FailureKind::QuotaExceeded.is_retryable());
        assert!(FailureKind::Network.is_retryable());
        assert!(!FailureKind::InvalidKey.is_retryable());
        assert!(!FailureKind::Blocked.is_retryable());
    }

    #[test]
    fn test_parse_retry_delay_gemini_body() {
        let body = r#"{"error": {"details": [{"retryDelay": "7s"}]}}"#;
        assert_eq!(parse_retry_delay(body), Some(7));
    }

    #[test]
    fn test_parse_retry_delay_prose() {
        assert_eq!(parse_retry_delay("please retry after 30 seconds"), Some(30));
        assert_eq!(parse_retry_delay("no hint here"), None);
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_secs(1), 2);
        assert_eq!(backoff_secs(2), 4);
        assert_eq!(backoff_secs(3), 8);
    }

    #[test]
    fn test_extract_text_concatenates_parts() {
        let response = json!({
            "candidates": [{
                "content": {"parts": [{"text": "hello "}, {"text": "world"}]}
            }]
        });
        assert_eq!(extract_text(&response), "hello world");
        assert_eq!(extract_text(&json!({})), "");
    }

    #[test]
    fn test_extract_inline_blobs_both_spellings() {
        let response = json!({
            "candidates": [{
                "content": {"parts": [
                    {"inlineData": {"mimeType": "image/png", "data": "AQID"}},
                    {"inline_data": {"mime_type": "audio/L16;rate=24000", "data": "BAUG"}},
                    {"inlineData": {"mimeType": "image/png", "data": "!!!not-base64!!!"}},
                    {"text": "caption"}
                ]}
            }]
        });
        let blobs = extract_inline_blobs(&response);
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].mime, "image/png");
        assert_eq!(blobs[0].data, vec![1, 2, 3]);
        assert_eq!(blobs[1].mime, "audio/L16;rate=24000");
    }

    #[test]
    fn test_block_reason_paths() {
        let prompt_block = json!({"promptFeedback": {"blockReason": "PROHIBITED_CONTENT"}});
        assert_eq!(block_reason(&prompt_block).as_deref(), Some("PROHIBITED_CONTENT"));

        let candidate_block = json!({"candidates": [{"finishReason": "IMAGE_SAFETY"}]});
        assert_eq!(block_reason(&candidate_block).as_deref(), Some("IMAGE_SAFETY"));

        let clean = json!({"candidates": [{"finishReason": "STOP"}]});
        assert_eq!(block_reason(&clean), None);
    }

    #[test]
    fn test_extract_usage() {
        let response = json!({
            "usageMetadata": {"promptTokenCount": 1200, "candidatesTokenCount": 450, "totalTokenCount": 1650}
        });
        let usage = extract_usage(&response);
        assert_eq!(usage.prompt, 1200);
        assert_eq!(usage.output, 450);
        assert_eq!(usage.total, 1650);

        let mut total = TokenUsage::default();
        total.add(usage);
        total.add(usage);
        assert_eq!(total.total, 3300);
    }

    #[test]
    fn test_api_error_displays_user_message() {
        let err = ApiError::new(FailureKind::QuotaExceeded, "raw body".repeat(100));
        assert!(err.to_string().contains("quota exceeded"));
        assert!(err.detail.len() <= 200);
    }
}
