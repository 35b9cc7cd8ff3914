use std::sync::Arc;

use hackathon::ai::{AiBackend, ClaudeBackend};
use hackathon::chat::PgSessionStore;
use hackathon::storage::PgBlobStore;
use hackathon::{build_router, db, AppState, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hackathon=info,tower_http=info".into()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(pool.as_ref()).await?;

    let ai: Option<Arc<dyn AiBackend>> = match &config.claude_api_key {
        Some(key) => Some(Arc::new(ClaudeBackend::new(
            key.clone(),
            config.ai_models.clone(),
        )?)),
        None => None,
    };

    let state = Arc::new(AppState {
        blobs: Arc::new(PgBlobStore::new(pool.clone())),
        sessions: Arc::new(PgSessionStore::new(pool.clone())),
        pool,
        config: config.clone(),
        ai,
    });

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Hackathon API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
