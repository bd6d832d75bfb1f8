//! Shared test helpers: fake AI clients and ready-made service state.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use bytes::Bytes;

use crate::ai::{
    AiError, ImageLabeler, ImageSource, SpeechSynthesizer, TextGenerator, TranscriptError,
    TranscriptSegment, TranscriptSource,
};
use crate::config::{
    AccessibilityConfig, GeminiConfig, MetadataBackend, NoteStoreBackend, NoteStoreConfig,
    NotesConfig, ServerConfig, StorageConfig,
};
use crate::object_store::{LocalStore, ObjectStore, ObjectStoreError};
use crate::storage::Database;
use crate::{AccessibilityState, NotesState};

pub const TEST_UPLOAD_LIMIT: u64 = 1024 * 1024;

/// Records prompts and answers with a fixed reply.
#[derive(Default)]
pub struct FakeModel {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for FakeModel {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Canned transcript outcome for every video.
pub enum FakeTranscripts {
    Segments(Vec<String>),
    Disabled,
    Broken(String),
}

#[async_trait]
impl TranscriptSource for FakeTranscripts {
    async fn fetch_transcript(
        &self,
        video_id: &str,
        _languages: &[&str],
    ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
        match self {
            FakeTranscripts::Segments(texts) => Ok(texts
                .iter()
                .enumerate()
                .map(|(i, text)| TranscriptSegment {
                    text: text.clone(),
                    start: i as f64,
                    duration: 1.0,
                })
                .collect()),
            FakeTranscripts::Disabled => Err(TranscriptError::Disabled(video_id.to_string())),
            FakeTranscripts::Broken(msg) => Err(TranscriptError::Fetch(msg.clone())),
        }
    }
}

/// Returns fixed labels and remembers what it was shown.
pub struct FakeLabeler {
    pub labels: Vec<String>,
    pub seen: Mutex<Vec<ImageSource>>,
}

impl FakeLabeler {
    pub fn new(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ImageLabeler for FakeLabeler {
    async fn labels(&self, image: ImageSource) -> Result<Vec<String>, AiError> {
        self.seen.lock().unwrap().push(image);
        Ok(self.labels.clone())
    }
}

/// "Synthesizes" by echoing the text bytes back.
#[derive(Default)]
pub struct EchoSpeech {
    pub texts: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechSynthesizer for EchoSpeech {
    async fn synthesize(&self, text: &str) -> Result<Bytes, AiError> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(Bytes::copy_from_slice(text.as_bytes()))
    }
}

/// Notes state backed by a temporary redb database and base directory.
pub fn notes_state(
    temp_dir: &tempfile::TempDir,
    model: Arc<FakeModel>,
    transcripts: FakeTranscripts,
) -> Arc<NotesState> {
    let base_dir = temp_dir.path().join("site");
    let data_dir = temp_dir.path().join("data");

    let config = NotesConfig {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            max_upload_size: TEST_UPLOAD_LIMIT,
        },
        base_dir,
        store: NoteStoreConfig {
            backend: NoteStoreBackend::Local,
            data_dir: data_dir.to_string_lossy().to_string(),
            ..Default::default()
        },
        gemini: GeminiConfig {
            api_key: "test-key".to_string(),
            model: "gemini-test".to_string(),
        },
    };
    std::fs::create_dir_all(config.upload_dir()).expect("Failed to create upload dir");

    let db = Database::open(&data_dir).expect("Failed to open test database");

    Arc::new(NotesState {
        config,
        notes: Arc::new(db),
        model,
        transcripts: Arc::new(transcripts),
    })
}

/// Accessibility state with a local object store and redb metadata.
/// Also returns the database so tests can inspect stored records.
pub fn accessibility_state(
    temp_dir: &tempfile::TempDir,
    labeler: Arc<FakeLabeler>,
    speech: Arc<EchoSpeech>,
) -> (Arc<AccessibilityState>, Database) {
    accessibility_state_with_store(temp_dir, labeler, speech, |local| {
        Arc::new(local) as Arc<dyn ObjectStore>
    })
}

/// Like [`accessibility_state`], letting the test wrap the local store.
pub fn accessibility_state_with_store(
    temp_dir: &tempfile::TempDir,
    labeler: Arc<FakeLabeler>,
    speech: Arc<EchoSpeech>,
    wrap: impl FnOnce(LocalStore) -> Arc<dyn ObjectStore>,
) -> (Arc<AccessibilityState>, Database) {
    let files_dir = temp_dir.path().join("files");
    let data_dir = temp_dir.path().join("data");

    let config = AccessibilityConfig {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            max_upload_size: TEST_UPLOAD_LIMIT,
        },
        credentials_file: None,
        project_id: None,
        storage: StorageConfig {
            local_storage_path: files_dir.to_string_lossy().to_string(),
            public_base_url: "http://localhost/files".to_string(),
            ..Default::default()
        },
        metadata: MetadataBackend::Local,
        data_dir: data_dir.to_string_lossy().to_string(),
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let object_store = LocalStore::new(&files_dir, &config.storage.public_base_url)
        .expect("Failed to create test object store");

    let state = Arc::new(AccessibilityState {
        config,
        documents: Arc::new(db.clone()),
        object_store: wrap(object_store),
        labeler,
        speech,
    });
    (state, db)
}

/// Local storage where granting public access always fails.
pub struct PrivateOnlyStore {
    pub inner: LocalStore,
    /// Fail with `NotFound` instead of a backend error.
    pub report_missing: bool,
}

#[async_trait]
impl ObjectStore for PrivateOnlyStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), ObjectStoreError> {
        self.inner.put(key, data, content_type).await
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.inner.delete(key).await
    }

    async fn make_public(&self, key: &str) -> Result<String, ObjectStoreError> {
        if self.report_missing {
            Err(ObjectStoreError::NotFound(key.to_string()))
        } else {
            Err(ObjectStoreError::Backend("ACL update returned 403".to_string()))
        }
    }
}

/// A minimal DOCX whose body has one `<w:p>` per entry.
pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    use std::io::Write;

    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();

    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    write!(
        zip,
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    )
    .unwrap();
    zip.finish().unwrap().into_inner()
}

// ============================================================================
// Request builders
// ============================================================================

const BOUNDARY: &str = "----study-notes-test-boundary";

/// POST with a single multipart file field.
pub fn multipart_request(
    uri: &str,
    field: &str,
    file_name: Option<&str>,
    data: &[u8],
) -> Request<Body> {
    let disposition = match file_name {
        Some(name) => format!("form-data; name=\"{field}\"; filename=\"{name}\""),
        None => format!("form-data; name=\"{field}\""),
    };

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn json_request(uri: &str, json: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

pub fn empty_post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: axum::response::Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}
