use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::notes::SummaryResponse;
use crate::ai::{self, youtube};
use crate::api::response::{ApiError, AppJson};
use crate::NotesState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ExplainTextRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct YoutubeExplainRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(message))
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn explain_text(
    State(state): State<Arc<NotesState>>,
    AppJson(req): AppJson<ExplainTextRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let text = required(req.text, "text is required")?;
    let summary = ai::summarize(state.model.as_ref(), &text, "").await?;
    Ok(Json(SummaryResponse { summary }))
}

pub async fn youtube_explain(
    State(state): State<Arc<NotesState>>,
    AppJson(req): AppJson<YoutubeExplainRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let url = required(req.url, "url is required")?;
    let video_id = youtube::extract_video_id(&url)
        .ok_or_else(|| ApiError::bad_request("could not parse video id"))?;

    let segments = state
        .transcripts
        .fetch_transcript(video_id, &["en"])
        .await
        .map_err(|e| {
            if e.is_unavailable() {
                tracing::debug!(video_id, error = %e, "No transcript");
                ApiError::bad_request("no transcript available for this video")
            } else {
                ApiError::upstream(format!("transcript fetch failed: {e}"))
            }
        })?;

    let transcript = youtube::transcript_text(&segments);
    let summary = state
        .model
        .generate(&ai::transcript_prompt(&transcript))
        .await?;
    Ok(Json(SummaryResponse { summary }))
}

pub async fn chat(
    State(state): State<Arc<NotesState>>,
    AppJson(req): AppJson<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let query = required(req.query, "query is required")?;
    let context = req.context.unwrap_or_default();

    let answer = state
        .model
        .generate(&ai::chat_prompt(&query, &context))
        .await?;
    Ok(Json(ChatResponse { answer }))
}
