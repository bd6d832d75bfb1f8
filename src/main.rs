use std::sync::Arc;
use tracing::info;

use study_notes::{
    ai::{GeminiClient, YouTubeTranscripts},
    api,
    config::{NoteStoreBackend, NotesConfig},
    server,
    storage::{Database, MongoNoteStore, NoteStore},
    NotesState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    server::init_tracing();

    info!(version = env!("CARGO_PKG_VERSION"), "notes-server starting");

    let config = NotesConfig::load()?;

    std::fs::create_dir_all(config.upload_dir())?;
    info!("Serving files from: {}", config.base_dir.display());

    let notes: Arc<dyn NoteStore> = match config.store.backend {
        NoteStoreBackend::Mongo => {
            let uri = config
                .store
                .mongo_uri
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("MONGO_URI validated in config"))?;
            let store = MongoNoteStore::connect(uri, &config.store.mongo_db).await?;
            info!("Using MongoDB note store, database: {}", config.store.mongo_db);
            Arc::new(store)
        }
        NoteStoreBackend::Local => {
            let db = Database::open(&config.store.data_dir)?;
            info!("Using local note store at: {}", config.store.data_dir);
            Arc::new(db)
        }
    };

    let client = reqwest::Client::new();
    let model = Arc::new(GeminiClient::new(client.clone(), &config.gemini));
    info!("Using Gemini model: {}", config.gemini.model);

    let bind_address = config.server.bind_address.clone();
    let state = Arc::new(NotesState {
        config,
        notes,
        model,
        transcripts: Arc::new(YouTubeTranscripts::new(client)),
    });

    let app = api::create_notes_router(state);
    server::serve(app, &bind_address).await?;
    Ok(())
}
