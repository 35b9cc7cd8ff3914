// Binary object storage for uploaded submission files.
//
// Files are addressed by an opaque id. The rest of the crate only talks to the
// `BlobStore` trait; `PgBlobStore` keeps the bytes in Postgres and
// `MemoryBlobStore` keeps them in process memory.

mod memory;
mod postgres;

pub use memory::MemoryBlobStore;
pub use postgres::PgBlobStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobInfo {
    pub id: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub length: u64,
    pub metadata: serde_json::Value,
    pub uploaded_at: DateTime<Utc>,
}

impl BlobInfo {
    pub fn is_pdf(&self) -> bool {
        self.filename.to_lowercase().ends_with(".pdf")
    }

    pub fn is_plain_text(&self) -> bool {
        self.filename.to_lowercase().ends_with(".txt")
            || self.content_type.as_deref() == Some("text/plain")
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    // Store `bytes` and return the new id. `metadata.contentType`, when present,
    // becomes the blob's content type.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        metadata: serde_json::Value,
    ) -> Result<String, StorageError>;

    async fn download(&self, id: &str) -> Result<Vec<u8>, StorageError>;

    async fn info(&self, id: &str) -> Result<BlobInfo, StorageError>;

    async fn delete(&self, id: &str) -> Result<(), StorageError>;
}

pub fn generate_blob_id() -> String {
    format!(
        "{}_{}",
        Utc::now().format("%Y%m%d"),
        Uuid::new_v4().simple()
    )
}

fn content_type_of(metadata: &serde_json::Value) -> Option<String> {
    metadata
        .get("contentType")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
