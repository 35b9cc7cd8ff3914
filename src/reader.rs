use serde::Serialize;
use tracing::{info, warn};

use crate::pdf;
use crate::storage::{BlobStore, StorageError};

pub const UNSUPPORTED_FORMAT: &str = "[Error: File format not supported for text extraction]";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub content: String,
    // Character count before truncation.
    pub length: usize,
    pub filename: String,
}

// Text of a stored file, truncated to `char_limit` characters.
//
// PDFs go through the extraction chain on a blocking thread; the only await
// points are the blob store calls. Extraction itself cannot fail.
pub async fn read_file(
    store: &dyn BlobStore,
    file_id: &str,
    char_limit: usize,
) -> Result<FileContent, StorageError> {
    let info = store.info(file_id).await?;
    let bytes = store.download(file_id).await?;

    let content = if info.is_pdf() {
        let text = tokio::task::spawn_blocking(move || pdf::extract_text(&bytes))
            .await
            .unwrap_or_else(|e| {
                warn!(file_id, error = %e, "PDF extraction task failed");
                pdf::FALLBACK_NOTICE.to_string()
            });
        if pdf::is_fallback_notice(&text) {
            warn!(file_id, filename = %info.filename, "PDF unreadable, using notice");
        }
        text
    } else if info.is_plain_text() {
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        String::from_utf8(bytes).unwrap_or_else(|_| UNSUPPORTED_FORMAT.to_string())
    };

    let length = content.chars().count();
    info!(file_id, filename = %info.filename, length, "File content read");

    Ok(FileContent {
        content: truncate_chars(&content, char_limit),
        length,
        filename: info.filename,
    })
}

pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((byte_index, _)) => input[..byte_index].to_string(),
        None => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBlobStore;
    use serde_json::json;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("Việt Nam", 3), "Việ");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[tokio::test]
    async fn plain_text_is_decoded() {
        let store = MemoryBlobStore::new();
        let id = store
            .upload("Ghi chú".as_bytes().to_vec(), "notes.txt", json!({}))
            .await
            .unwrap();

        let file = read_file(&store, &id, 100).await.unwrap();
        assert_eq!(file.content, "Ghi chú");
        assert_eq!(file.length, 7);
        assert_eq!(file.filename, "notes.txt");
    }

    #[tokio::test]
    async fn unreadable_pdf_yields_notice() {
        let store = MemoryBlobStore::new();
        let id = store
            .upload(vec![0xFF; 256], "slides.pdf", json!({}))
            .await
            .unwrap();

        let file = read_file(&store, &id, 50_000).await.unwrap();
        assert_eq!(file.content, pdf::FALLBACK_NOTICE);
    }

    #[tokio::test]
    async fn binary_of_unknown_type_is_unsupported() {
        let store = MemoryBlobStore::new();
        let id = store
            .upload(vec![0xC3, 0x28, 0xA0], "slides.pptx", json!({}))
            .await
            .unwrap();

        let file = read_file(&store, &id, 100).await.unwrap();
        assert_eq!(file.content, UNSUPPORTED_FORMAT);
    }

    #[tokio::test]
    async fn long_content_is_truncated_but_length_is_full() {
        let store = MemoryBlobStore::new();
        let id = store
            .upload("a".repeat(120).into_bytes(), "essay.txt", json!({}))
            .await
            .unwrap();

        let file = read_file(&store, &id, 50).await.unwrap();
        assert_eq!(file.content.len(), 50);
        assert_eq!(file.length, 120);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let store = MemoryBlobStore::new();
        assert!(matches!(
            read_file(&store, "nope", 10).await,
            Err(StorageError::NotFound(_))
        ));
    }
}
