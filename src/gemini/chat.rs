//! Plan-grounded chat.
//!
//! The whole plan rides in the system instruction, so the model answers
//! about THIS repair rather than repairs in general. State is a plain
//! turn list; every ask re-sends the window.

use super::{block_reason, extract_text, extract_usage, ApiError, FailureKind, GeminiClient, TokenUsage};
use crate::plan::RepairPlan;
use crate::prompts;
use serde_json::{json, Value};

/// Oldest turns fall off past this; the system instruction always stays.
const HISTORY_CAP: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    fn wire_name(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

pub struct ChatSession {
    system_instruction: String,
    pub history: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn for_plan(plan: &RepairPlan) -> Self {
        Self {
            system_instruction: prompts::chat_system_instruction(&plan.to_chat_context()),
            history: Vec::new(),
        }
    }

    /// Send a question grounded in the plan. On failure the pending user
    /// turn is removed again, so a retry re-sends cleanly.
    pub async fn ask(
        &mut self,
        client: &GeminiClient,
        model: &str,
        question: &str,
    ) -> anyhow::Result<(String, TokenUsage)> {
        self.history.push(ChatTurn {
            role: ChatRole::User,
            text: question.to_string(),
        });

        let payload = self.request_payload();
        let outcome = match client.generate(model, &payload).await {
            Ok(response) => self.absorb_answer(&response),
            Err(err) => Err(err.into()),
        };

        if outcome.is_err() {
            self.history.pop();
        }
        outcome
    }

    fn absorb_answer(&mut self, response: &Value) -> anyhow::Result<(String, TokenUsage)> {
        if let Some(reason) = block_reason(response) {
            return Err(ApiError::new(FailureKind::Blocked, reason).into());
        }

        let answer = extract_text(response);
        if answer.trim().is_empty() {
            return Err(ApiError::new(FailureKind::Malformed, "empty chat response").into());
        }

        self.history.push(ChatTurn {
            role: ChatRole::Model,
            text: answer.clone(),
        });
        self.trim_history();
        Ok((answer, extract_usage(response)))
    }

    fn request_payload(&self) -> Value {
        let contents: Vec<Value> = self
            .history
            .iter()
            .map(|turn| {
                json!({
                    "role": turn.role.wire_name(),
                    "parts": [{"text": turn.text}]
                })
            })
            .collect();

        json!({
            "systemInstruction": {
                "parts": [{"text": self.system_instruction}]
            },
            "contents": contents,
            "generationConfig": {
                "temperature": 0.7,
                "maxOutputTokens": 2048
            }
        })
    }

    // Drop turns in pairs so the window keeps alternating roles.
    fn trim_history(&mut self) {
        while self.history.len() > HISTORY_CAP {
            self.history.drain(0..2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::parse_plan;

    fn test_plan() -> RepairPlan {
        parse_plan(
            r#"{"title": "Mug Handle", "summary": "s", "steps": [
                {"title": "Dry fit", "description": "Hold the handle in place.", "action": "inspect"}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_system_instruction_carries_plan() {
        let session = ChatSession::for_plan(&test_plan());
        let payload = session.request_payload();
        let instruction = payload["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap();
        assert!(instruction.contains("REPAIR PLAN: Mug Handle"));
        assert!(instruction.contains("1. Dry fit [inspect]"));
    }

    #[test]
    fn test_payload_roles_alternate() {
        let mut session = ChatSession::for_plan(&test_plan());
        session.history.push(ChatTurn {
            role: ChatRole::User,
            text: "Which glue?".to_string(),
        });
        session.history.push(ChatTurn {
            role: ChatRole::Model,
            text: "Two-part epoxy from the pile.".to_string(),
        });

        let payload = session.request_payload();
        let contents = payload["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
    }

    #[test]
    fn test_absorb_answer_appends_model_turn() {
        let mut session = ChatSession::for_plan(&test_plan());
        session.history.push(ChatTurn {
            role: ChatRole::User,
            text: "Which glue?".to_string(),
        });

        let response = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "Use the epoxy."}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 100, "candidatesTokenCount": 12, "totalTokenCount": 112}
        });
        let (answer, usage) = session.absorb_answer(&response).unwrap();
        assert_eq!(answer, "Use the epoxy.");
        assert_eq!(usage.total, 112);
        assert_eq!(session.history.len(), 2);
    }

    #[test]
    fn test_blocked_answer_is_error() {
        let mut session = ChatSession::for_plan(&test_plan());
        session.history.push(ChatTurn {
            role: ChatRole::User,
            text: "q".to_string(),
        });
        let response = serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = session.absorb_answer(&response).unwrap_err();
        let api = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api.kind, FailureKind::Blocked);
        // absorb leaves the pop to ask(); the turn is still pending here
        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn test_history_trims_oldest_pairs() {
        let mut session = ChatSession::for_plan(&test_plan());
        for i in 0..22 {
            session.history.push(ChatTurn {
                role: ChatRole::User,
                text: format!("question {}", i),
            });
            session.history.push(ChatTurn {
                role: ChatRole::Model,
                text: format!("answer {}", i),
            });
        }
        session.trim_history();
        assert_eq!(session.history.len(), HISTORY_CAP);
        assert_eq!(session.history[0].text, "question 2");
        assert_eq!(session.history[0].role, ChatRole::User);
    }
}
