mod accessibility;
mod admin;
mod assistant;
mod home;
mod notes;
mod static_files;

use std::path::PathBuf;

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::{header, HeaderMap, StatusCode};
use bytes::Bytes;

use crate::api::response::ApiError;
use crate::extract;
use crate::object_store::join_url;

pub use accessibility::{generate_alt_text, generate_tts, upload_document};
pub use admin::health;
pub use assistant::{chat, explain_text, youtube_explain};
pub use home::home;
pub use notes::{create_note, explain_note};
pub use static_files::{serve_file, serve_object};

/// The `file` part of a multipart upload.
struct UploadedFile {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl UploadedFile {
    /// Client filename reduced to its last path component.
    fn file_name(&self) -> Result<String, ApiError> {
        self.file_name
            .as_deref()
            .and_then(|name| name.rsplit(['/', '\\']).next())
            .map(str::trim)
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("file has no filename"))
    }

    /// Declared content type, or a guess from the filename.
    fn mime_type(&self, file_name: &str) -> String {
        self.content_type
            .clone()
            .filter(|ct| ct != "application/octet-stream")
            .or_else(|| mime_guess::from_path(file_name).first().map(|m| m.to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }
}

fn too_large(max_upload_size: u64) -> ApiError {
    ApiError::payload_too_large(format!(
        "File exceeds maximum upload size of {max_upload_size} bytes"
    ))
}

/// A body cut off by the route's length limit is a 413, anything else a 400.
fn multipart_error(e: MultipartError, context: &str, max_upload_size: u64) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_upload_size)
    } else {
        ApiError::bad_request(format!("{context}: {}", e.body_text()))
    }
}

/// Read the multipart body, returning the `file` field if one was sent.
/// Other fields are ignored.
async fn read_file_field(
    mut multipart: Multipart,
    max_upload_size: u64,
) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Invalid multipart data", max_upload_size))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, "Failed to read file", max_upload_size))?;

        if data.len() as u64 > max_upload_size {
            return Err(too_large(max_upload_size));
        }

        return Ok(Some(UploadedFile {
            file_name,
            content_type,
            data,
        }));
    }

    Ok(None)
}

/// Random prefix that keeps concurrent uploads of the same name apart.
fn unique_name(file_name: &str) -> String {
    format!("{}_{file_name}", uuid::Uuid::new_v4().simple())
}

/// Extract text off the async runtime. Failures are logged and yield `""`.
async fn extract_text(path: PathBuf, file_name: String) -> String {
    let result =
        tokio::task::spawn_blocking(move || extract::extract_path(&path, &file_name)).await;
    settle_extraction(result)
}

/// Same as [`extract_text`] for an in-memory upload (spooled to a temp file).
async fn extract_uploaded_text(data: Bytes, file_name: String) -> String {
    let result =
        tokio::task::spawn_blocking(move || extract::extract_bytes(&data, &file_name)).await;
    settle_extraction(result)
}

fn settle_extraction(
    result: Result<Result<String, extract::ExtractError>, tokio::task::JoinError>,
) -> String {
    match result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Text extraction failed, continuing without content");
            String::new()
        }
        Err(e) => {
            tracing::error!(error = %e, "Text extraction task failed");
            String::new()
        }
    }
}

/// `scheme://host` the client used to reach us.
fn host_url(headers: &HeaderMap) -> String {
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{scheme}://{host}")
}
