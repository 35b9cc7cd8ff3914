use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::info;

use super::{content_type_of, generate_blob_id, BlobInfo, BlobStore, StorageError};
use crate::db::DbPool;

pub struct PgBlobStore {
    pool: DbPool,
}

impl PgBlobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct BlobInfoRow {
    id: String,
    filename: String,
    content_type: Option<String>,
    length: i64,
    metadata: Json<serde_json::Value>,
    uploaded_at: DateTime<Utc>,
}

impl From<BlobInfoRow> for BlobInfo {
    fn from(row: BlobInfoRow) -> Self {
        Self {
            id: row.id,
            filename: row.filename,
            content_type: row.content_type,
            length: u64::try_from(row.length).unwrap_or(0),
            metadata: row.metadata.0,
            uploaded_at: row.uploaded_at,
        }
    }
}

#[async_trait]
impl BlobStore for PgBlobStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        metadata: serde_json::Value,
    ) -> Result<String, StorageError> {
        let id = generate_blob_id();
        let length = bytes.len() as i64;

        sqlx::query(
            r#"
            INSERT INTO blobs (id, filename, content_type, length, metadata, data)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&id)
        .bind(filename)
        .bind(content_type_of(&metadata))
        .bind(length)
        .bind(Json(&metadata))
        .bind(bytes)
        .execute(self.pool.as_ref())
        .await?;

        info!(id = %id, filename, length, "Blob stored");
        Ok(id)
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        let data: Option<(Vec<u8>,)> = sqlx::query_as("SELECT data FROM blobs WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        let (data,) = data.ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        info!(id, size = data.len(), "Blob downloaded");
        Ok(data)
    }

    async fn info(&self, id: &str) -> Result<BlobInfo, StorageError> {
        sqlx::query_as::<_, BlobInfoRow>(
            "SELECT id, filename, content_type, length, metadata, uploaded_at FROM blobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .map(BlobInfo::from)
        .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM blobs WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        info!(id, "Blob deleted");
        Ok(())
    }
}
