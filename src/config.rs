use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
    #[error("{0} is required")]
    Missing(&'static str),
}

/// Settings shared by both services.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

// ============================================================================
// Notes service
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteStoreBackend {
    Local,
    Mongo,
}

#[derive(Debug, Clone)]
pub struct NotesConfig {
    pub server: ServerConfig,
    /// Root for served files. Uploads land in `<base_dir>/uploads`.
    pub base_dir: PathBuf,
    pub store: NoteStoreConfig,
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone)]
pub struct NoteStoreConfig {
    pub backend: NoteStoreBackend,
    pub mongo_uri: Option<String>,
    pub mongo_db: String,
    /// redb directory for the local backend
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

impl Default for NoteStoreConfig {
    fn default() -> Self {
        Self {
            backend: NoteStoreBackend::Mongo,
            mongo_uri: None,
            mongo_db: "b60".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl NotesConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            resolve_bind_address(non_empty_var, "NOTES_BIND_ADDRESS", "0.0.0.0:5000");

        let base_dir = PathBuf::from(std::env::var("BASE_DIR").unwrap_or_else(|_| ".".to_string()));

        let backend = match std::env::var("NOTES_STORE")
            .unwrap_or_else(|_| "mongo".to_string())
            .to_lowercase()
            .as_str()
        {
            "local" => NoteStoreBackend::Local,
            _ => NoteStoreBackend::Mongo,
        };

        let config = NotesConfig {
            server: ServerConfig {
                bind_address,
                max_upload_size: max_upload_size(),
            },
            base_dir,
            store: NoteStoreConfig {
                backend,
                mongo_uri: non_empty_var("MONGO_URI"),
                mongo_db: std::env::var("MONGO_DB").unwrap_or_else(|_| "b60".to_string()),
                data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            },
            gemini: GeminiConfig {
                api_key: non_empty_var("GEMINI_API_KEY").unwrap_or_default(),
                model: std::env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == NoteStoreBackend::Mongo && self.store.mongo_uri.is_none() {
            return Err(ConfigError::Missing(
                "MONGO_URI (e.g. mongodb://localhost:27017)",
            ));
        }

        if self.gemini.api_key.is_empty() {
            return Err(ConfigError::Missing("GEMINI_API_KEY"));
        }

        if self.gemini.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "GEMINI_MODEL cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.base_dir.join("uploads")
    }
}

// ============================================================================
// Accessibility service
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Gcs,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataBackend {
    Firestore,
    Local,
}

#[derive(Debug, Clone)]
pub struct AccessibilityConfig {
    pub server: ServerConfig,
    /// Path to a service account JSON key. Falls back to the metadata server.
    pub credentials_file: Option<String>,
    pub project_id: Option<String>,
    pub storage: StorageConfig,
    pub metadata: MetadataBackend,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Bucket name; defaults to `<project>.appspot.com`
    pub bucket: Option<String>,
    /// Directory for local storage backend
    pub local_storage_path: String,
    /// URL prefix under which the local backend's objects are reachable
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            bucket: None,
            local_storage_path: "./files".to_string(),
            public_base_url: "http://localhost:8080/files".to_string(),
        }
    }
}

impl AccessibilityConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            resolve_bind_address(non_empty_var, "ACCESSIBILITY_BIND_ADDRESS", "0.0.0.0:8080");

        let storage_backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "gcs".to_string())
            .to_lowercase()
            .as_str()
        {
            "local" => StorageBackend::Local,
            _ => StorageBackend::Gcs,
        };

        let metadata = match std::env::var("METADATA_STORE")
            .unwrap_or_else(|_| "firestore".to_string())
            .to_lowercase()
            .as_str()
        {
            "local" => MetadataBackend::Local,
            _ => MetadataBackend::Firestore,
        };

        let project_id = non_empty_var("GCP_PROJECT_ID");
        let bucket = non_empty_var("STORAGE_BUCKET")
            .or_else(|| project_id.as_ref().map(|p| format!("{p}.appspot.com")));

        let config = AccessibilityConfig {
            server: ServerConfig {
                bind_address: bind_address.clone(),
                max_upload_size: max_upload_size(),
            },
            credentials_file: non_empty_var("GOOGLE_APPLICATION_CREDENTIALS"),
            project_id,
            storage: StorageConfig {
                backend: storage_backend,
                bucket,
                local_storage_path: std::env::var("LOCAL_STORAGE_PATH")
                    .unwrap_or_else(|_| "./files".to_string()),
                public_base_url: non_empty_var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|| default_public_base_url(&bind_address)),
            },
            metadata,
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Only checks what the selected backends need to be constructed.
    /// Credentials are resolved on the first cloud call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Gcs && self.storage.bucket.is_none() {
            return Err(ConfigError::ValidationError(
                "STORAGE_BUCKET or GCP_PROJECT_ID is required when STORAGE_BACKEND=gcs"
                    .to_string(),
            ));
        }

        if self.metadata == MetadataBackend::Firestore && self.project_id.is_none() {
            return Err(ConfigError::ValidationError(
                "GCP_PROJECT_ID is required when METADATA_STORE=firestore".to_string(),
            ));
        }

        if self.credentials_file.is_none() {
            tracing::warn!(
                "GOOGLE_APPLICATION_CREDENTIALS not set, cloud calls will use the metadata server"
            );
        }

        Ok(())
    }
}

/// The service's own variable wins over the shared `BIND_ADDRESS`.
fn resolve_bind_address(
    lookup: impl Fn(&str) -> Option<String>,
    service_var: &str,
    default: &str,
) -> String {
    lookup(service_var)
        .or_else(|| lookup("BIND_ADDRESS"))
        .unwrap_or_else(|| default.to_string())
}

/// Where local objects are served when `PUBLIC_BASE_URL` is unset.
/// A wildcard listen address is not something a browser can reach, so it
/// becomes `localhost`.
fn default_public_base_url(bind_address: &str) -> String {
    let host = match bind_address.parse::<SocketAddr>() {
        Ok(addr) if addr.ip().is_unspecified() => format!("localhost:{}", addr.port()),
        Ok(addr) => addr.to_string(),
        Err(_) => bind_address.to_string(),
    };
    format!("http://{host}/files")
}

fn max_upload_size() -> u64 {
    std::env::var("MAX_UPLOAD_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(50 * 1024 * 1024) // 50MB
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn notes_config() -> NotesConfig {
        NotesConfig {
            server: ServerConfig {
                bind_address: "127.0.0.1:0".to_string(),
                max_upload_size: 1024,
            },
            base_dir: PathBuf::from("."),
            store: NoteStoreConfig::default(),
            gemini: GeminiConfig {
                api_key: "key".to_string(),
                model: "gemini-1.5-flash".to_string(),
            },
        }
    }

    #[test]
    fn mongo_backend_requires_uri() {
        let config = notes_config();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn local_backend_does_not_need_mongo() {
        let mut config = notes_config();
        config.store.backend = NoteStoreBackend::Local;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn gemini_key_is_required() {
        let mut config = notes_config();
        config.store.mongo_uri = Some("mongodb://localhost:27017".to_string());
        config.gemini.api_key.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("GEMINI_API_KEY"))
        ));
    }

    #[test]
    fn upload_dir_is_under_base_dir() {
        let mut config = notes_config();
        config.base_dir = PathBuf::from("/srv/notes");
        assert_eq!(config.upload_dir(), PathBuf::from("/srv/notes/uploads"));
    }

    #[test]
    fn service_bind_address_beats_shared_one() {
        let env: HashMap<&str, &str> = [
            ("BIND_ADDRESS", "0.0.0.0:9000"),
            ("NOTES_BIND_ADDRESS", "127.0.0.1:5001"),
        ]
        .into();
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        assert_eq!(
            resolve_bind_address(lookup, "NOTES_BIND_ADDRESS", "0.0.0.0:5000"),
            "127.0.0.1:5001"
        );
        assert_eq!(
            resolve_bind_address(lookup, "ACCESSIBILITY_BIND_ADDRESS", "0.0.0.0:8080"),
            "0.0.0.0:9000"
        );
        assert_eq!(
            resolve_bind_address(|_| None, "NOTES_BIND_ADDRESS", "0.0.0.0:5000"),
            "0.0.0.0:5000"
        );
    }

    #[test]
    fn public_base_url_defaults_to_a_reachable_host() {
        assert_eq!(
            default_public_base_url("0.0.0.0:8080"),
            "http://localhost:8080/files"
        );
        assert_eq!(
            default_public_base_url("[::]:8080"),
            "http://localhost:8080/files"
        );
        assert_eq!(
            default_public_base_url("127.0.0.1:3000"),
            "http://127.0.0.1:3000/files"
        );
        assert_eq!(
            default_public_base_url("notes.internal:8080"),
            "http://notes.internal:8080/files"
        );
    }

    #[test]
    fn firestore_requires_project() {
        let config = AccessibilityConfig {
            server: ServerConfig {
                bind_address: "127.0.0.1:0".to_string(),
                max_upload_size: 1024,
            },
            credentials_file: None,
            project_id: None,
            storage: StorageConfig::default(),
            metadata: MetadataBackend::Firestore,
            data_dir: "./data".to_string(),
        };
        assert!(config.validate().is_err());
    }
}
