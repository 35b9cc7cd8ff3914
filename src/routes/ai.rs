use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::ai::scoring::{analyze_consistency, suggest_score, SubmissionContext};
use crate::ai::topic::generate_topic;
use crate::error::ApiResult;
use crate::scoring::{reconcile, AiSuggestion, Rubric};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ScoreSuggestionRequest {
    #[serde(rename_all = "camelCase")]
    Suggest {
        #[serde(default)]
        topic: String,
        #[serde(default)]
        notes: String,
        file_content: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Analyze {
        judge_score: Rubric,
        ai_suggestion: AiSuggestion,
    },
}

// Unknown `action` values fail deserialization and surface as 400.
pub async fn score_suggestion(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScoreSuggestionRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;

    match request {
        ScoreSuggestionRequest::Suggest {
            topic,
            notes,
            file_content,
        } => {
            let ctx = SubmissionContext {
                topic: &topic,
                notes: &notes,
                file_content: file_content.as_deref().filter(|c| !c.trim().is_empty()),
            };
            let suggestion = suggest_score(state.ai(), &ctx).await;
            Ok(Json(json!({ "suggestion": suggestion })))
        }
        ScoreSuggestionRequest::Analyze {
            judge_score,
            ai_suggestion,
        } => {
            judge_score.validate()?;
            ai_suggestion.validate()?;
            let flagged = reconcile(&judge_score, Some(&ai_suggestion)).flagged;
            let analysis = analyze_consistency(state.ai(), &judge_score, &ai_suggestion).await;
            Ok(Json(json!({ "analysis": analysis, "flagged": flagged })))
        }
    }
}

pub async fn generate_topic_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let topic = generate_topic(state.ai()).await;
    Json(json!({ "topic": topic }))
}
