use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::chat::{send_message, CHAT_UNAVAILABLE_REPLY};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ChatRequest {
    Create {
        topic: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Send {
        session_id: String,
        message: String,
        topic: Option<String>,
    },
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;

    match request {
        ChatRequest::Create { topic } => {
            if state.ai.is_none() {
                return Err(ApiError::ServiceUnavailable(
                    "AI service is not available".to_string(),
                ));
            }
            let session_id = state.sessions.create(topic).await?;
            tracing::info!(session_id = %session_id, "Chat session created");
            Ok(Json(json!({ "sessionId": session_id })))
        }
        ChatRequest::Send {
            session_id,
            message,
            topic,
        } => {
            if message.trim().is_empty() {
                return Err(ApiError::BadRequest("message is required".to_string()));
            }
            let response = match state.ai() {
                Some(ai) => {
                    send_message(state.sessions.as_ref(), ai, &session_id, &message, topic)
                        .await?
                }
                None => CHAT_UNAVAILABLE_REPLY.to_string(),
            };
            Ok(Json(json!({ "response": response })))
        }
    }
}
