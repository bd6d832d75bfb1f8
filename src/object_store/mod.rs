mod gcs;
mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::gcp::AuthError;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Abstraction over object storage backends.
/// Keys are path-like (`uploads/<hex>_<name>`, `tts/<hex>.mp3`).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes, content_type: &str)
        -> Result<(), ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
    /// Make the object world-readable and return its public URL.
    async fn make_public(&self, key: &str) -> Result<String, ObjectStoreError>;
}

/// Reject keys that could escape a bucket prefix or base directory.
pub(crate) fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
    if key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(ObjectStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Append percent-encoded path segments to a base URL.
pub(crate) fn join_url(base: &str, segments: &[&str]) -> String {
    let Ok(mut url) = reqwest::Url::parse(base) else {
        return format!("{}/{}", base.trim_end_matches('/'), segments.join("/"));
    };
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url.to_string()
}
