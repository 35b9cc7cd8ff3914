// Research-assistant chat for contestants.
//
// Sessions live behind `SessionStore` so a conversation outlives the process
// that started it. The model is stateless; every turn resends the stored history.

mod memory;
mod postgres;

pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::ai::{AiBackend, ChatMessage, CompletionRequest};
use crate::storage::StorageError;

pub const CHAT_UNAVAILABLE_REPLY: &str =
    "I'm having trouble connecting right now. Please try again in a moment.";
pub const EMPTY_REPLY: &str = "I couldn't generate a response.";

const CHAT_TEMPERATURE: f32 = 0.8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub topic: Option<String>,
    pub history: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(topic: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: format!("session-{}", Uuid::new_v4().simple()),
            topic: topic.filter(|t| !t.trim().is_empty()),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn with_id(id: &str, topic: Option<String>) -> Self {
        Self {
            id: id.to_string(),
            ..Self::new(topic)
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    // Start an empty session and return its id.
    async fn create(&self, topic: Option<String>) -> Result<String, StorageError> {
        let session = ChatSession::new(topic);
        self.put(&session).await?;
        Ok(session.id)
    }

    async fn get(&self, id: &str) -> Result<Option<ChatSession>, StorageError>;

    // Insert or replace.
    async fn put(&self, session: &ChatSession) -> Result<(), StorageError>;

    async fn evict(&self, id: &str) -> Result<(), StorageError>;
}

pub fn system_instruction(topic: Option<&str>) -> String {
    let mut instruction = String::from(
        "You are an expert AI Research Assistant for the Vietnam Policy Hackathon & Debate competition \
focused on \"Vietnam's Economy in the AI Era\" (Kinh tế Việt Nam trong kỷ nguyên AI).

YOUR ROLE:
- Help contestants research, brainstorm, and structure policy arguments
- Provide Vietnam-specific context, data, and examples
- Suggest credible sources (Vietnamese government reports, academic papers, ASEAN AI frameworks)
- Guide debate preparation with pros/cons analysis
- Offer practical implementation strategies for the Vietnamese context

COMMUNICATION STYLE:
- Be encouraging and constructive
- Provide actionable, specific suggestions
- Structure responses clearly with bullet points
- Ask clarifying questions to better assist",
    );

    if let Some(topic) = topic {
        instruction.push_str(&format!(
            "\n\nCURRENT TOPIC: \"{topic}\"\n\n\
Tailor all your responses to help contestants develop a comprehensive policy proposal for this \
specific topic. Focus on:
1. Current situation in Vietnam
2. Policy objectives and stakeholders
3. Implementation roadmap
4. Potential challenges and solutions
5. Success metrics and evaluation criteria"
        ));
    }

    instruction
}

// Send one user message in `session_id`, creating the session if it is unknown.
//
// A backend failure returns a friendly reply and leaves the stored history untouched.
pub async fn send_message(
    store: &dyn SessionStore,
    ai: &dyn AiBackend,
    session_id: &str,
    message: &str,
    topic: Option<String>,
) -> Result<String, StorageError> {
    let mut session = match store.get(session_id).await? {
        Some(session) => session,
        None => {
            info!(session_id, "Chat session not found, recreating");
            ChatSession::with_id(session_id, topic)
        }
    };

    let mut messages = session.history.clone();
    messages.push(ChatMessage::user(message));

    let request = CompletionRequest {
        system: Some(system_instruction(session.topic.as_deref())),
        messages,
        schema: None,
        temperature: CHAT_TEMPERATURE,
    };

    let reply = match ai.complete(request).await {
        Ok(text) if text.trim().is_empty() => EMPTY_REPLY.to_string(),
        Ok(text) => text,
        Err(e) => {
            error!(session_id, error = %e, "Chat completion failed");
            return Ok(CHAT_UNAVAILABLE_REPLY.to_string());
        }
    };

    session.history.push(ChatMessage::user(message));
    session.history.push(ChatMessage::model(reply.clone()));
    session.updated_at = Utc::now();
    store.put(&session).await?;

    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiError, ChatRole};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Echo {
        fail: bool,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    #[async_trait]
    impl AiBackend for Echo {
        async fn complete(&self, request: CompletionRequest) -> Result<String, AiError> {
            let last = request.messages.last().map(|m| m.text.clone()).unwrap_or_default();
            *self.last_request.lock().unwrap() = Some(request);
            if self.fail {
                return Err(AiError::EmptyResponse);
            }
            Ok(format!("echo: {last}"))
        }
    }

    #[test]
    fn topic_is_included_in_instruction() {
        assert!(system_instruction(Some("AI và nông nghiệp")).contains("CURRENT TOPIC: \"AI và nông nghiệp\""));
        assert!(!system_instruction(None).contains("CURRENT TOPIC"));
    }

    #[tokio::test]
    async fn conversation_history_accumulates() {
        let store = MemorySessionStore::new();
        let ai = Echo::default();
        let id = store.create(Some("Fintech".into())).await.unwrap();

        let first = send_message(&store, &ai, &id, "xin chào", None).await.unwrap();
        assert_eq!(first, "echo: xin chào");
        send_message(&store, &ai, &id, "tiếp tục", None).await.unwrap();

        let session = store.get(&id).await.unwrap().unwrap();
        assert_eq!(session.history.len(), 4);
        assert_eq!(session.history[2], ChatMessage::user("tiếp tục"));
        assert_eq!(session.history[3].role, ChatRole::Model);

        let request = ai.last_request.lock().unwrap().take().unwrap();
        assert_eq!(request.messages.len(), 3);
        assert!(request.system.unwrap().contains("Fintech"));
    }

    #[tokio::test]
    async fn unknown_session_is_recreated_with_topic() {
        let store = MemorySessionStore::new();
        let ai = Echo::default();

        send_message(&store, &ai, "session-lost", "hello", Some("Logistics".into()))
            .await
            .unwrap();

        let session = store.get("session-lost").await.unwrap().unwrap();
        assert_eq!(session.topic.as_deref(), Some("Logistics"));
        assert_eq!(session.history.len(), 2);
    }

    #[tokio::test]
    async fn backend_failure_leaves_history_untouched() {
        let store = MemorySessionStore::new();
        let ai = Echo {
            fail: true,
            ..Default::default()
        };
        let id = store.create(None).await.unwrap();

        let reply = send_message(&store, &ai, &id, "hello", None).await.unwrap();
        assert_eq!(reply, CHAT_UNAVAILABLE_REPLY);
        assert!(store.get(&id).await.unwrap().unwrap().history.is_empty());
    }

    #[tokio::test]
    async fn evicted_session_is_gone() {
        let store = MemorySessionStore::new();
        let id = store.create(None).await.unwrap();
        store.evict(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
    }
}
