use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{ChatSession, SessionStore};
use crate::storage::StorageError;

// Sessions held in process memory; lost on restart.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, ChatSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &str) -> Result<Option<ChatSession>, StorageError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn put(&self, session: &ChatSession) -> Result<(), StorageError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn evict(&self, id: &str) -> Result<(), StorageError> {
        self.sessions.write().await.remove(id);
        Ok(())
    }
}
