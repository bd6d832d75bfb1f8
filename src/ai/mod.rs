//! Clients for the third-party AI services the handlers call.
//!
//! Each service sits behind a trait so handlers can be exercised with
//! in-process fakes; the production implementations are thin REST clients.

mod gemini;
mod tts;
mod vision;
pub mod youtube;

pub use gemini::GeminiClient;
pub use tts::TtsClient;
pub use vision::VisionClient;
pub use youtube::{TranscriptError, TranscriptSegment, TranscriptSource, YouTubeTranscripts};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::gcp::AuthError;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{service} returned {status}: {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A generative language model: prompt in, trimmed text out.
/// An empty string means the model produced no text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// Where the image to label comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Bytes(Bytes),
    Uri(String),
}

#[async_trait]
pub trait ImageLabeler: Send + Sync {
    /// Label descriptions, best match first.
    async fn labels(&self, image: ImageSource) -> Result<Vec<String>, AiError>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// MP3 audio for `text`.
    async fn synthesize(&self, text: &str) -> Result<Bytes, AiError>;
}

// ============================================================================
// Prompts
// ============================================================================

pub const MAX_TRANSCRIPT_CHARS: usize = 8000;
pub const MAX_TTS_CHARS: usize = 5000;
pub const MAX_ALT_TEXT_LABELS: usize = 5;

pub fn summary_prompt(text: &str, context_note: &str) -> String {
    format!(
        "You are a concise study assistant. Summarize the content clearly and list 3-5 key points.\n\
         Context: {context_note}\n\n\
         Content:\n{text}\n"
    )
}

pub fn transcript_prompt(transcript: &str) -> String {
    format!(
        "Summarize this YouTube transcript and list key takeaways in bullets. \
         Keep it concise and student-friendly.\n\nTranscript:\n{transcript}"
    )
}

pub fn chat_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a helpful study assistant. Answer clearly and concisely.\n\
         Context: {context}\n\nQuestion: {query}"
    )
}

/// Summarize study material, tagging the prompt with a context line
/// (usually the note title).
pub async fn summarize(
    model: &dyn TextGenerator,
    text: &str,
    context_note: &str,
) -> Result<String, AiError> {
    model.generate(&summary_prompt(text, context_note)).await
}

/// `"Image of: a, b, c"` from the top labels.
pub fn alt_text(labels: &[String]) -> String {
    let top: Vec<&str> = labels
        .iter()
        .take(MAX_ALT_TEXT_LABELS)
        .map(String::as_str)
        .collect();
    format!("Image of: {}", top.join(", "))
}

/// Pull the message out of a Google API error body, falling back to the raw text.
pub(crate) fn google_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

pub(crate) async fn check_response(
    service: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, AiError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(AiError::Api {
        service,
        status,
        message: google_error_message(&body),
    })
}
