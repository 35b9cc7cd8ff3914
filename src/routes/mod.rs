mod ai;
pub mod auth;
mod chat;
mod files;
mod submissions;
mod teams;

pub use ai::{generate_topic_handler, score_suggestion};
pub use chat::chat;
pub use files::{download_file, read_file_handler, upload_handler};
pub use submissions::{create_submission, delete_submission, list_submissions};
pub use teams::{create_team, list_teams, score_team};

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "hackathon" }))
}
