use std::sync::Arc;
use tracing::info;

use study_notes::{
    ai::{TtsClient, VisionClient},
    api,
    config::{AccessibilityConfig, MetadataBackend, StorageBackend},
    gcp::TokenProvider,
    object_store as obj, server,
    storage::{Database, DocumentStore, FirestoreStore},
    AccessibilityState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    server::init_tracing();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "accessibility-server starting"
    );

    let config = AccessibilityConfig::load()?;

    let client = reqwest::Client::new();
    // Shared by every Google client; the token is fetched on first use
    let auth = Arc::new(TokenProvider::new(
        client.clone(),
        config.credentials_file.as_deref(),
    ));

    let object_store: Arc<dyn obj::ObjectStore> = match config.storage.backend {
        StorageBackend::Local => {
            let store = obj::LocalStore::new(
                &config.storage.local_storage_path,
                &config.storage.public_base_url,
            )?;
            info!(
                "Using local storage backend at: {}",
                config.storage.local_storage_path
            );
            Arc::new(store)
        }
        StorageBackend::Gcs => {
            let bucket = config
                .storage
                .bucket
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("STORAGE_BUCKET validated in config"))?;
            info!("Using GCS storage backend, bucket: {}", bucket);
            Arc::new(obj::GcsStore::new(bucket, client.clone(), auth.clone()))
        }
    };

    let documents: Arc<dyn DocumentStore> = match config.metadata {
        MetadataBackend::Firestore => {
            let project_id = config
                .project_id
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("GCP_PROJECT_ID validated in config"))?;
            info!("Using Firestore metadata store, project: {}", project_id);
            Arc::new(FirestoreStore::new(client.clone(), auth.clone(), project_id))
        }
        MetadataBackend::Local => {
            let db = Database::open(&config.data_dir)?;
            info!("Using local metadata store at: {}", config.data_dir);
            Arc::new(db)
        }
    };

    let bind_address = config.server.bind_address.clone();
    let state = Arc::new(AccessibilityState {
        config,
        documents,
        object_store,
        labeler: Arc::new(VisionClient::new(client.clone(), auth.clone())),
        speech: Arc::new(TtsClient::new(client, auth)),
    });

    let app = api::create_accessibility_router(state);
    server::serve(app, &bind_address).await?;
    Ok(())
}
