use async_trait::async_trait;
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use mongodb::{Client, Collection};
use serde::Deserialize;

use super::models::{NewNote, NoteRecord};
use super::{NoteStore, StoreError};

const COLLECTION: &str = "documents";

/// Notes kept in MongoDB; ids are ObjectId hex strings.
pub struct MongoNoteStore {
    collection: Collection<Document>,
}

/// Stored shape; older documents may be missing fields.
#[derive(Debug, Deserialize)]
struct StoredNote {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    public_url: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

impl From<StoredNote> for NoteRecord {
    fn from(n: StoredNote) -> Self {
        NoteRecord {
            id: n.id.to_hex(),
            title: n.title.unwrap_or_default(),
            content: n.content.unwrap_or_default(),
            public_url: n.public_url,
            snippet: n.snippet.unwrap_or_default(),
        }
    }
}

impl MongoNoteStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let collection = client.database(database).collection::<Document>(COLLECTION);
        Ok(Self { collection })
    }
}

#[async_trait]
impl NoteStore for MongoNoteStore {
    async fn insert_note(&self, note: NewNote) -> Result<String, StoreError> {
        let document = bson::to_document(&note).map_err(|e| StoreError::Bson(e.to_string()))?;
        let result = self.collection.insert_one(document).await?;

        result
            .inserted_id
            .as_object_id()
            .map(|oid| oid.to_hex())
            .ok_or_else(|| StoreError::Bson(format!("unexpected _id {}", result.inserted_id)))
    }

    async fn get_note(&self, id: &str) -> Result<Option<NoteRecord>, StoreError> {
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };

        let Some(document) = self.collection.find_one(doc! { "_id": oid }).await? else {
            return Ok(None);
        };

        let stored: StoredNote =
            bson::from_document(document).map_err(|e| StoreError::Bson(e.to_string()))?;
        Ok(Some(stored.into()))
    }
}
