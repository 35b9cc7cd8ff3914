use crate::ai::AiBackend;
use crate::chat::SessionStore;
use crate::config::Config;
use crate::db::DbPool;
use crate::storage::BlobStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub blobs: Arc<dyn BlobStore>,
    pub sessions: Arc<dyn SessionStore>,
    // `None` when no API key is configured.
    pub ai: Option<Arc<dyn AiBackend>>,
}

impl AppState {
    pub fn ai(&self) -> Option<&dyn AiBackend> {
        self.ai.as_deref()
    }
}
