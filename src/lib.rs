//! study-notes - backends for turning study material into summaries, alt text and audio
//!
//! Two services share this crate:
//! - the notes service: uploads (PDF/DOCX or pasted text), Gemini summaries,
//!   YouTube transcript summaries, chat, and serving of uploaded files
//! - the accessibility service: uploads to object storage with extracted
//!   text metadata, image alt text via Cloud Vision, and text-to-speech
//!
//! External services sit behind traits held in the shared state, so the
//! binaries wire real clients and tests wire fakes.

pub mod ai;
pub mod api;
pub mod config;
pub mod extract;
pub mod gcp;
pub mod object_store;
pub mod server;
pub mod storage;
pub mod text;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use ai::{ImageLabeler, SpeechSynthesizer, TextGenerator, TranscriptSource};
use config::{AccessibilityConfig, NotesConfig};
use object_store::ObjectStore;
use storage::{DocumentStore, NoteStore};

/// Shared state for the notes service
pub struct NotesState {
    pub config: NotesConfig,
    pub notes: Arc<dyn NoteStore>,
    pub model: Arc<dyn TextGenerator>,
    pub transcripts: Arc<dyn TranscriptSource>,
}

/// Shared state for the accessibility service
pub struct AccessibilityState {
    pub config: AccessibilityConfig,
    pub documents: Arc<dyn DocumentStore>,
    pub object_store: Arc<dyn ObjectStore>,
    pub labeler: Arc<dyn ImageLabeler>,
    pub speech: Arc<dyn SpeechSynthesizer>,
}
