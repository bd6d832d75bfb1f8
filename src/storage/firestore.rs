use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::models::NewDocument;
use super::{DocumentStore, StoreError};
use crate::gcp::TokenProvider;

const COLLECTION: &str = "documents";

/// Accessibility upload metadata in Cloud Firestore (REST API).
pub struct FirestoreStore {
    client: Client,
    auth: Arc<TokenProvider>,
    project_id: String,
}

#[derive(Deserialize)]
struct CreatedDocument {
    /// `projects/<p>/databases/(default)/documents/<collection>/<id>`
    name: String,
}

impl FirestoreStore {
    pub fn new(client: Client, auth: Arc<TokenProvider>, project_id: &str) -> Self {
        Self {
            client,
            auth,
            project_id: project_id.to_string(),
        }
    }

    fn collection_url(&self) -> String {
        format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents/{COLLECTION}",
            self.project_id
        )
    }
}

/// Encode a flat record as Firestore typed fields.
fn to_fields(doc: &NewDocument) -> Value {
    let mut fields = Map::new();
    for (name, value) in [
        ("title", &doc.title),
        ("storage_path", &doc.storage_path),
        ("public_url", &doc.public_url),
        ("extracted_snippet", &doc.extracted_snippet),
    ] {
        fields.insert(name.to_string(), json!({ "stringValue": value }));
    }
    json!({ "fields": fields })
}

fn document_id(name: &str) -> Option<&str> {
    name.rsplit('/').next().filter(|id| !id.is_empty())
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn insert_document(&self, doc: NewDocument) -> Result<String, StoreError> {
        let token = self.auth.token().await?;

        let resp = self
            .client
            .post(self.collection_url())
            .bearer_auth(&token)
            .json(&to_fields(&doc))
            .send()
            .await
            .map_err(|e| StoreError::Firestore(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Firestore(format!(
                "create document failed ({status}): {body}"
            )));
        }

        let created: CreatedDocument = resp
            .json()
            .await
            .map_err(|e| StoreError::Firestore(e.to_string()))?;

        document_id(&created.name)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Firestore(format!("unexpected document name {}", created.name)))
    }
}
