use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::{AiBackend, AiError, ChatRole, CompletionRequest};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const MAX_RETRIES: u32 = 3;
const MAX_TOKENS: u32 = 4000;

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorBody {
    error: Option<ClaudeError>,
}

#[derive(Debug, Deserialize)]
struct ClaudeError {
    message: Option<String>,
}

pub struct ClaudeBackend {
    client: Client,
    api_key: String,
    models: Vec<String>,
    base_backoff: Duration,
}

impl ClaudeBackend {
    pub fn new(api_key: String, models: Vec<String>) -> Result<Self, AiError> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;

        Ok(Self {
            client,
            api_key,
            models,
            base_backoff: Duration::from_secs(2),
        })
    }

    fn build_body(&self, model: &str, request: &CompletionRequest) -> ClaudeRequest {
        let system = match (&request.system, &request.schema) {
            (system, Some(schema)) => Some(format!(
                "{}\n\nRespond with a single JSON object and nothing else. It must conform to this JSON schema:\n{}",
                system.as_deref().unwrap_or_default(),
                schema
            )),
            (system, None) => system.clone(),
        };

        ClaudeRequest {
            model: model.to_string(),
            max_tokens: MAX_TOKENS,
            system,
            messages: request
                .messages
                .iter()
                .map(|m| Message {
                    role: match m.role {
                        ChatRole::User => "user",
                        ChatRole::Model => "assistant",
                    },
                    content: m.text.clone(),
                })
                .collect(),
            // The Messages API accepts 0.0..=1.0.
            temperature: request.temperature.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl AiBackend for ClaudeBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AiError> {
        let mut model_index = 0;
        let mut retry_count = 0;
        let mut backoff = self.base_backoff;

        loop {
            let model = self
                .models
                .get(model_index)
                .ok_or(AiError::Disabled)?
                .clone();
            info!(model = %model, messages = request.messages.len(), "Calling Claude");

            let response = self
                .client
                .post(API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .json(&self.build_body(&model, &request))
                .send()
                .await?;

            let status = response.status();
            let text = response.text().await?;

            if status.is_success() {
                let parsed: ClaudeResponse = serde_json::from_str(&text)
                    .map_err(|e| AiError::InvalidJson(e.to_string()))?;

                return parsed
                    .content
                    .into_iter()
                    .find_map(|block| block.text)
                    .filter(|t| !t.trim().is_empty())
                    .ok_or(AiError::EmptyResponse);
            }

            // Rate limits and unknown models move on to the next model in the list.
            if matches!(status.as_u16(), 429 | 404) && model_index + 1 < self.models.len() {
                warn!(model = %model, status = status.as_u16(), "Switching to fallback model");
                model_index += 1;
                retry_count = 0;
                continue;
            }

            if retry_count >= MAX_RETRIES {
                let message = serde_json::from_str::<ClaudeErrorBody>(&text)
                    .ok()
                    .and_then(|body| body.error)
                    .and_then(|e| e.message)
                    .unwrap_or(text);
                return Err(AiError::Api {
                    attempts: retry_count + 1,
                    message,
                });
            }

            retry_count += 1;
            warn!(
                model = %model,
                status = status.as_u16(),
                retry = retry_count,
                "Claude request failed, backing off"
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ChatMessage;
    use serde_json::json;

    fn backend() -> ClaudeBackend {
        ClaudeBackend::new("key".into(), vec!["claude-test".into()]).unwrap()
    }

    #[test]
    fn body_maps_roles_and_clamps_temperature() {
        let mut request = CompletionRequest::prompt("xin chào").with_temperature(1.2);
        request.messages.push(ChatMessage::model("chào bạn"));

        let body = serde_json::to_value(backend().build_body("claude-test", &request)).unwrap();
        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["temperature"], 1.0);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert!(body.get("system").is_none());
    }

    #[test]
    fn schema_is_appended_to_system_prompt() {
        let request = CompletionRequest::prompt("score this")
            .with_system("You are a judge.")
            .with_schema(json!({"type": "object"}));

        let body = backend().build_body("claude-test", &request);
        let system = body.system.unwrap();
        assert!(system.starts_with("You are a judge."));
        assert!(system.contains(r#"{"type":"object"}"#));
    }
}
