use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::auth::{AuthUser, Role};
use crate::db::{self, NewSubmission, Submission};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::storage::StorageError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    team_id: Option<String>,
    team_name: Option<String>,
    topic: Option<String>,
    #[serde(default)]
    notes: String,
    file_id: Option<String>,
    file_name: Option<String>,
    #[serde(default)]
    file_size: i64,
}

impl SubmitRequest {
    fn into_new_submission(self) -> Result<NewSubmission, ApiError> {
        fn required(value: Option<String>) -> Option<String> {
            value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        }

        match (
            required(self.team_id),
            required(self.team_name),
            required(self.topic),
            required(self.file_id),
            required(self.file_name),
        ) {
            (Some(team_id), Some(team_name), Some(topic), Some(file_id), Some(file_name)) => {
                Ok(NewSubmission {
                    team_id,
                    team_name,
                    topic,
                    notes: self.notes,
                    file_id,
                    file_name,
                    file_size: self.file_size.max(0),
                })
            }
            _ => Err(ApiError::BadRequest("Missing required fields".to_string())),
        }
    }
}

pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Submission>>> {
    let submissions = db::list_submissions(state.pool.as_ref()).await?;
    Ok(Json(submissions))
}

pub async fn create_submission(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    user.require(Role::Contestant, "submit")?;
    let Json(request) = payload?;
    let submission = request.into_new_submission()?;

    let saved = db::upsert_submission(state.pool.as_ref(), &submission).await?;
    tracing::info!(team_id = %saved.team_id, file_id = %saved.file_id, "Submission saved");

    Ok(Json(json!({ "success": true, "submission": saved })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSubmissionRequest {
    team_id: Option<String>,
}

pub async fn delete_submission(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<DeleteSubmissionRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    user.require(Role::Admin, "delete submissions")?;
    let Json(request) = payload?;
    let team_id = request
        .team_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("teamId is required".to_string()))?;

    let removed = db::delete_submission(state.pool.as_ref(), &team_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("submission for team {team_id}")))?;

    // The uploaded file goes with the submission; a blob that is already gone is fine.
    match state.blobs.delete(&removed.file_id).await {
        Ok(()) | Err(StorageError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }
    tracing::info!(team_id = %team_id, file_id = %removed.file_id, "Submission deleted");

    Ok(Json(json!({ "success": true })))
}
