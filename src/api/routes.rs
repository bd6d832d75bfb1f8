use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::StorageBackend;
use crate::{AccessibilityState, NotesState};

/// Room for multipart boundaries and part headers on top of the file itself,
/// so the exact size check in the handler decides at the limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

fn body_limit(max_upload_size: u64) -> DefaultBodyLimit {
    DefaultBodyLimit::max((max_upload_size as usize).saturating_add(MULTIPART_OVERHEAD))
}

pub fn create_notes_router(state: Arc<NotesState>) -> Router {
    let upload_limit = state.config.server.max_upload_size;

    Router::new()
        .route("/", get(handlers::home))
        // Notes
        .route(
            "/api/notes",
            post(handlers::create_note).layer(body_limit(upload_limit)),
        )
        .route("/api/notes/:id/explain", post(handlers::explain_note))
        // Assistant
        .route("/api/explain-text", post(handlers::explain_text))
        .route("/api/youtube-explain", post(handlers::youtube_explain))
        .route("/api/chat", post(handlers::chat))
        // Uploaded files
        .route("/files/*filepath", get(handlers::serve_file))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn create_accessibility_router(state: Arc<AccessibilityState>) -> Router {
    let upload_limit = state.config.server.max_upload_size;

    let mut router = Router::new()
        .route(
            "/upload",
            post(handlers::upload_document).layer(body_limit(upload_limit)),
        )
        .route(
            "/generate-alt-text",
            post(handlers::generate_alt_text).layer(body_limit(upload_limit)),
        )
        .route("/generate-tts", post(handlers::generate_tts))
        .route("/_internal/health", get(handlers::health));

    // Local objects have no bucket URL, so serve them here
    if state.config.storage.backend == StorageBackend::Local {
        router = router.route("/files/*key", get(handlers::serve_object));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
