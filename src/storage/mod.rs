//! Persistence for notes and accessibility upload metadata.
//!
//! Handlers only see the [`NoteStore`] and [`DocumentStore`] traits. The
//! embedded redb [`Database`] implements both for local runs and tests;
//! MongoDB backs notes and Firestore backs accessibility metadata in
//! production.

pub mod db;
mod documents;
mod firestore;
pub mod models;
mod mongo;
mod notes;
mod tables;

pub use db::{Database, DatabaseError};
pub use firestore::FirestoreStore;
pub use mongo::MongoNoteStore;
pub use tables::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::gcp::AuthError;
use models::{NewDocument, NewNote, NoteRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("BSON error: {0}")]
    Bson(String),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error("Firestore error: {0}")]
    Firestore(String),
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Insert a note and return its generated id.
    async fn insert_note(&self, note: NewNote) -> Result<String, StoreError>;
    /// Look up a note. Ids the backend cannot parse are simply not found.
    async fn get_note(&self, id: &str) -> Result<Option<NoteRecord>, StoreError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert upload metadata and return its generated id.
    async fn insert_document(&self, doc: NewDocument) -> Result<String, StoreError>;
}
