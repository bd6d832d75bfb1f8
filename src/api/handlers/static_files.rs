use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::path::Component;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::api::response::ApiError;
use crate::{AccessibilityState, NotesState};

fn content_type_for(name: &str) -> HeaderValue {
    mime_guess::from_path(name)
        .first()
        .and_then(|m| m.to_string().parse().ok())
        .unwrap_or(HeaderValue::from_static("application/octet-stream"))
}

/// Serve a file from the notes base directory.
/// Route: GET /files/*filepath
pub async fn serve_file(
    State(state): State<Arc<NotesState>>,
    Path(filepath): Path<String>,
) -> Result<Response, ApiError> {
    let relative = std::path::Path::new(filepath.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(ApiError::bad_request("invalid file path"));
    }

    let path = state.config.base_dir.join(relative);
    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|_| ApiError::not_found("file not found"))?;
    if metadata.is_dir() {
        return Err(ApiError::bad_request("cannot serve directory"));
    }

    // Symlinks must not lead outside the base directory
    let base = tokio::fs::canonicalize(&state.config.base_dir)
        .await
        .map_err(|e| ApiError::internal(format!("Base directory unavailable: {e}")))?;
    let resolved = tokio::fs::canonicalize(&path)
        .await
        .map_err(|_| ApiError::not_found("file not found"))?;
    if !resolved.starts_with(&base) {
        return Err(ApiError::not_found("file not found"));
    }

    let file = tokio::fs::File::open(&resolved)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to open file: {e}")))?;

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type_for(&filepath));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));

    Ok(response)
}

/// Serve an object from the local object store.
/// Route: GET /files/*key
pub async fn serve_object(
    State(state): State<Arc<AccessibilityState>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let data = state.object_store.get(&key).await?;

    let mut response = (StatusCode::OK, data).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type_for(&key));
    Ok(response)
}
