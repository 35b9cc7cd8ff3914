// Generative-AI collaborator.
//
// Everything that talks to a model goes through `AiBackend`. Callers treat it as
// slow and unreliable: each feature built on top of it has a fallback answer for
// when the backend is disabled or failing.

mod claude;
pub mod scoring;
pub mod topic;

pub use claude::ClaudeBackend;

use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI service is not configured")]
    Disabled,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("AI service error after {attempts} attempts: {message}")]
    Api { attempts: u32, message: String },
    #[error("no text in response")]
    EmptyResponse,
    #[error("invalid JSON reply: {0}")]
    InvalidJson(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    // JSON schema the reply must conform to.
    pub schema: Option<serde_json::Value>,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            system: None,
            messages: vec![ChatMessage::user(text)],
            schema: None,
            temperature: 0.7,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
pub trait AiBackend: Send + Sync {
    // Raw text of the model's reply.
    async fn complete(&self, request: CompletionRequest) -> Result<String, AiError>;
}

static CODE_FENCE: OnceLock<Regex> = OnceLock::new();

// Parse a JSON reply, tolerating a surrounding markdown code fence.
pub fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> Result<T, AiError> {
    let fence = CODE_FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*\n?(.*?)\s*```\s*$").expect("valid regex")
    });
    let body = fence
        .captures(reply)
        .and_then(|c| c.get(1))
        .map_or(reply.trim(), |m| m.as_str());

    serde_json::from_str(body).map_err(|e| AiError::InvalidJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn parses_bare_json() {
        let value: Value = parse_json_reply(r#" {"a": 1} "#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn parses_fenced_json() {
        let value: Value = parse_json_reply("```json\n{\"a\": 2}\n```").unwrap();
        assert_eq!(value["a"], 2);

        let value: Value = parse_json_reply("```\n[1, 2]\n```\n").unwrap();
        assert_eq!(value[1], 2);
    }

    #[test]
    fn rejects_prose() {
        assert!(matches!(
            parse_json_reply::<Value>("Sure! Here is the score."),
            Err(AiError::InvalidJson(_))
        ));
    }

    #[test]
    fn chat_roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::model("xin chào")).unwrap();
        assert_eq!(json["role"], "model");
    }
}
