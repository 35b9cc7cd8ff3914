use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;

use super::{ChatSession, SessionStore};
use crate::ai::ChatMessage;
use crate::db::DbPool;
use crate::storage::StorageError;

pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: String,
    topic: Option<String>,
    history: Json<Vec<ChatMessage>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, id: &str) -> Result<Option<ChatSession>, StorageError> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM chat_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(|r| ChatSession {
            id: r.id,
            topic: r.topic,
            history: r.history.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }))
    }

    async fn put(&self, session: &ChatSession) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO chat_sessions (id, topic, history, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET topic = EXCLUDED.topic, history = EXCLUDED.history, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&session.id)
        .bind(&session.topic)
        .bind(Json(&session.history))
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn evict(&self, id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM chat_sessions WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}
