use axum::extract::State;
use axum::Json;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{extract_uploaded_text, read_file_field, unique_name};
use crate::ai::{self, ImageSource, MAX_TTS_CHARS};
use crate::api::response::{ApiError, AppJson, FileOrJson};
use crate::object_store::ObjectStoreError;
use crate::storage::models::NewDocument;
use crate::text::truncate_chars;
use crate::AccessibilityState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub url: String,
    pub text_len: usize,
}

#[derive(Debug, Deserialize)]
pub struct AltTextRequest {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AltTextResponse {
    pub alt_text: String,
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TtsResponse {
    pub tts_url: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Best-effort removal of an object nothing will reference.
async fn discard(state: &AccessibilityState, key: &str) {
    if let Err(e) = state.object_store.delete(key).await {
        tracing::warn!(key = %key, error = %e, "Failed to remove orphaned object");
    }
}

/// Make a freshly written object public, removing it if that fails.
async fn publish(state: &AccessibilityState, key: &str) -> Result<String, ApiError> {
    match state.object_store.make_public(key).await {
        Ok(url) => Ok(url),
        Err(e) => {
            discard(state, key).await;
            Err(match e {
                // We just wrote it, so this is the backend misbehaving
                ObjectStoreError::NotFound(_) => ApiError::upstream(e.to_string()),
                e => e.into(),
            })
        }
    }
}

pub async fn upload_document(
    State(state): State<Arc<AccessibilityState>>,
    body: FileOrJson<IgnoredAny>,
) -> Result<Json<UploadResponse>, ApiError> {
    let FileOrJson::Multipart(multipart) = body else {
        return Err(ApiError::bad_request("file is required"));
    };
    let file = read_file_field(multipart, state.config.server.max_upload_size)
        .await?
        .ok_or_else(|| ApiError::bad_request("file is required"))?;
    let file_name = file.file_name()?;
    let content_type = file.mime_type(&file_name);

    let text = extract_uploaded_text(file.data.clone(), file_name.clone()).await;
    let text_len = text.chars().count();

    let key = format!("uploads/{}", unique_name(&file_name));
    state
        .object_store
        .put(&key, file.data, &content_type)
        .await?;
    let url = publish(&state, &key).await?;

    let doc = NewDocument::new(file_name, key.clone(), url.clone(), &text);
    let id = match state.documents.insert_document(doc).await {
        Ok(id) => id,
        Err(e) => {
            discard(&state, &key).await;
            return Err(e.into());
        }
    };

    tracing::info!(document_id = %id, key = %key, text_len, "Stored upload");
    Ok(Json(UploadResponse { id, url, text_len }))
}

pub async fn generate_alt_text(
    State(state): State<Arc<AccessibilityState>>,
    body: FileOrJson<AltTextRequest>,
) -> Result<Json<AltTextResponse>, ApiError> {
    let image = match body {
        FileOrJson::Multipart(multipart) => read_file_field(
            multipart,
            state.config.server.max_upload_size,
        )
        .await?
        .map(|file| ImageSource::Bytes(file.data)),
        FileOrJson::Json(req) => req
            .image_url
            .filter(|url| !url.is_empty())
            .map(ImageSource::Uri),
        FileOrJson::Empty => None,
    }
    .ok_or_else(|| ApiError::bad_request("provide file or image_url"))?;

    let labels = state.labeler.labels(image).await?;
    Ok(Json(AltTextResponse {
        alt_text: ai::alt_text(&labels),
    }))
}

pub async fn generate_tts(
    State(state): State<Arc<AccessibilityState>>,
    AppJson(req): AppJson<TtsRequest>,
) -> Result<Json<TtsResponse>, ApiError> {
    let text = req
        .text
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("text is required"))?;

    let audio = state
        .speech
        .synthesize(truncate_chars(&text, MAX_TTS_CHARS))
        .await?;

    let key = format!("tts/{}.mp3", uuid::Uuid::new_v4().simple());
    state.object_store.put(&key, audio, "audio/mpeg").await?;
    let tts_url = publish(&state, &key).await?;

    tracing::debug!(key = %key, "Stored speech");
    Ok(Json(TtsResponse { tts_url }))
}
