use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{content_type_of, generate_blob_id, BlobInfo, BlobStore, StorageError};

// Process-local store for development and tests. Contents vanish on restart.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, (BlobInfo, Vec<u8>)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        metadata: serde_json::Value,
    ) -> Result<String, StorageError> {
        let id = generate_blob_id();
        let info = BlobInfo {
            id: id.clone(),
            filename: filename.to_string(),
            content_type: content_type_of(&metadata),
            length: bytes.len() as u64,
            metadata,
            uploaded_at: Utc::now(),
        };
        self.blobs.write().await.insert(id.clone(), (info, bytes));
        Ok(id)
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .read()
            .await
            .get(id)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn info(&self, id: &str) -> Result<BlobInfo, StorageError> {
        self.blobs
            .read()
            .await
            .get(id)
            .map(|(info, _)| info.clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.blobs
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }
}
