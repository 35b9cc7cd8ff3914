use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::auth::{AuthUser, Role};
use crate::db::{self, Team};
use crate::error::{ApiError, ApiResult};
use crate::scoring::{reconcile, AiSuggestion, Reconciliation, Rubric, TOTAL_MAX};
use crate::state::AppState;

pub async fn list_teams(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Team>>> {
    let teams = db::list_teams(state.pool.as_ref()).await?;
    Ok(Json(teams))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    team_id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    members: Vec<String>,
}

pub async fn create_team(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<CreateTeamRequest>, JsonRejection>,
) -> ApiResult<Json<Team>> {
    user.require(Role::Admin, "create teams")?;
    let Json(request) = payload?;

    let team_id = request.team_id.map(|s| s.trim().to_string()).unwrap_or_default();
    let name = request.name.map(|s| s.trim().to_string()).unwrap_or_default();
    if team_id.is_empty() || name.is_empty() {
        return Err(ApiError::BadRequest("teamId and name are required".to_string()));
    }

    let team = Team::new(team_id, name, request.members);
    let created = db::create_team(state.pool.as_ref(), &team)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("team {} already exists", team.team_id)))?;

    tracing::info!(team_id = %created.team_id, "Team created");
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreTeamRequest {
    team_id: String,
    judge_score: Rubric,
    ai_score: Option<u32>,
    ai_suggestion: Option<AiSuggestion>,
}

impl ScoreTeamRequest {
    // Validate and blend. A full suggestion takes precedence over a bare `aiScore`.
    fn reconcile(&self) -> Result<Reconciliation, ApiError> {
        self.judge_score.validate()?;
        if let Some(ai) = self.ai_score.filter(|&s| s > TOTAL_MAX) {
            return Err(ApiError::BadRequest(format!(
                "aiScore {ai} is outside 0..={TOTAL_MAX}"
            )));
        }

        Ok(match &self.ai_suggestion {
            Some(suggestion) => {
                suggestion.validate()?;
                reconcile(&self.judge_score, Some(suggestion))
            }
            None => Reconciliation::from_totals(&self.judge_score, self.ai_score),
        })
    }
}

pub async fn score_team(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<ScoreTeamRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    user.require(Role::Judge, "score teams")?;
    let Json(request) = payload?;
    let reconciliation = request.reconcile()?;

    let mut team = db::get_team(state.pool.as_ref(), &request.team_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("team {}", request.team_id)))?;

    if reconciliation.needs_review() {
        tracing::warn!(
            team_id = %team.team_id,
            judge_id = %user.id,
            flagged = reconciliation.flagged.len(),
            "Judge score diverges from AI suggestion"
        );
    }

    let rescore = team.is_scored_by(&user.id);
    team.record_score(&user.id, &reconciliation);
    db::save_team_score(state.pool.as_ref(), &team).await?;

    tracing::info!(
        team_id = %team.team_id,
        judge_id = %user.id,
        rescore,
        bgk = reconciliation.bgk,
        ai = reconciliation.ai,
        final_score = reconciliation.final_score,
        "Team scored"
    );

    Ok(Json(json!({
        "success": true,
        "team": team,
        "flagged": reconciliation.flagged,
    })))
}
