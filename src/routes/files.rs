use axum::{
    body::Body,
    extract::{
        multipart::MultipartError, rejection::JsonRejection, Multipart, Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::reader::{read_file, FileContent};
use crate::state::AppState;

pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut team_id = String::new();
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename = String::new();
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "teamId" {
            team_id = field
                .text()
                .await
                .map_err(multipart_error)?;
        } else if name == "file" {
            filename = field.file_name().unwrap_or("upload.bin").to_string();
            content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(multipart_error)?;
            file_data = Some(data.to_vec());
        }
    }

    let team_id = team_id.trim().to_string();
    let file_data = match file_data {
        Some(d) if !team_id.is_empty() => d,
        _ => {
            return Err(ApiError::BadRequest(
                "File and teamId are required".to_string(),
            ))
        }
    };

    if file_data.len() > state.config.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "File size exceeds {}MB limit",
            state.config.max_upload_bytes / (1024 * 1024)
        )));
    }

    let file_size = file_data.len();
    let metadata = json!({
        "teamId": team_id,
        "uploadedBy": user.id,
        "uploadedAt": chrono::Utc::now(),
        "contentType": content_type,
        "originalSize": file_size,
    });

    let file_id = state.blobs.upload(file_data, &filename, metadata).await?;
    tracing::info!(file_id = %file_id, filename = %filename, team_id = %team_id, "File uploaded");

    Ok(Json(json!({
        "success": true,
        "fileId": file_id,
        "fileName": filename,
        "fileSize": file_size,
    })))
}

pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> ApiResult<Response> {
    let info = state.blobs.info(&file_id).await?;
    let content = state.blobs.download(&file_id).await?;

    let mime = info
        .content_type
        .clone()
        .unwrap_or_else(|| mime_guess::from_path(&info.filename).first_or_octet_stream().to_string());

    tracing::info!(file_id = %file_id, filename = %info.filename, size = content.len(), "File download");

    Response::builder()
        .header(header::CONTENT_TYPE, mime)
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename*=UTF-8''{}",
                encode_rfc5987(&info.filename)
            ),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileRequest {
    file_id: Option<String>,
}

pub async fn read_file_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReadFileRequest>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Json(request) = payload?;
    let file_id = request
        .file_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("fileId is required".to_string()))?;

    let FileContent {
        content,
        length,
        filename,
    } = read_file(
        state.blobs.as_ref(),
        &file_id,
        state.config.read_file_char_limit,
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "content": content,
        "length": length,
        "filename": filename,
    })))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

// Percent-encode everything outside RFC 5987 attr-char.
fn encode_rfc5987(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc5987_encodes_unicode_and_spaces() {
        assert_eq!(encode_rfc5987("bài nộp.pdf"), "b%C3%A0i%20n%E1%BB%99p.pdf");
        assert_eq!(encode_rfc5987("plain-name_1.txt"), "plain-name_1.txt");
    }
}
