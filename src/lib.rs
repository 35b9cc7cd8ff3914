// Policy hackathon backend: submission storage, PDF text extraction and
// judge/AI score reconciliation behind a JSON API.

pub mod ai;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod pdf;
pub mod reader;
pub mod routes;
pub mod scoring;
pub mod state;
pub mod storage;

pub use config::Config;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// Room for multipart framing and the teamId field on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/api/upload",
            post(routes::upload_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/download/:file_id", get(routes::download_file))
        .route("/api/read-file", post(routes::read_file_handler))
        .route(
            "/api/submissions",
            get(routes::list_submissions)
                .post(routes::create_submission)
                .delete(routes::delete_submission),
        )
        .route(
            "/api/teams",
            get(routes::list_teams)
                .post(routes::create_team)
                .put(routes::score_team),
        )
        .route("/api/score-suggestion", post(routes::score_suggestion))
        .route("/api/generate-topic", post(routes::generate_topic_handler))
        .route("/api/chat", post(routes::chat))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
