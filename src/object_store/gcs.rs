use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};

use super::{validate_key, ObjectStore, ObjectStoreError};
use crate::gcp::TokenProvider;

const API_BASE: &str = "https://storage.googleapis.com";

/// Google Cloud Storage object store backend.
pub struct GcsStore {
    bucket: String,
    client: Client,
    auth: Arc<TokenProvider>,
}

impl GcsStore {
    pub fn new(bucket: &str, client: Client, auth: Arc<TokenProvider>) -> Self {
        Self {
            bucket: bucket.to_string(),
            client,
            auth,
        }
    }

    fn upload_url(&self) -> Result<Url, ObjectStoreError> {
        self.url(&["upload", "storage", "v1", "b", &self.bucket, "o"])
    }

    fn object_url(&self, key: &str) -> Result<Url, ObjectStoreError> {
        self.url(&["storage", "v1", "b", &self.bucket, "o", key])
    }

    fn acl_url(&self, key: &str) -> Result<Url, ObjectStoreError> {
        self.url(&["storage", "v1", "b", &self.bucket, "o", key, "acl"])
    }

    /// Browser-facing URL; key separators stay as path separators.
    pub fn public_url(&self, key: &str) -> Result<Url, ObjectStoreError> {
        let mut segments = vec![self.bucket.as_str()];
        segments.extend(key.split('/'));
        self.url(&segments)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ObjectStoreError> {
        let mut url = Url::parse(API_BASE).map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ObjectStoreError::Backend("GCS base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn check(resp: reqwest::Response, action: &str) -> Result<reqwest::Response, ObjectStoreError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(ObjectStoreError::Backend(format!(
        "GCS {action} failed ({status}): {body}"
    )))
}

fn backend(e: reqwest::Error) -> ObjectStoreError {
    ObjectStoreError::Backend(e.to_string())
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        validate_key(key)?;
        let token = self.auth.token().await?;

        let resp = self
            .client
            .post(self.upload_url()?)
            .query(&[("uploadType", "media"), ("name", key)])
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(backend)?;

        check(resp, "upload").await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        validate_key(key)?;
        let token = self.auth.token().await?;

        let resp = self
            .client
            .get(self.object_url(key)?)
            .query(&[("alt", "media")])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(backend)?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }

        check(resp, "download").await?.bytes().await.map_err(backend)
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        validate_key(key)?;
        let token = self.auth.token().await?;

        let resp = self
            .client
            .delete(self.object_url(key)?)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(backend)?;

        // 404 is fine -- object already gone
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(resp, "delete").await?;
        Ok(())
    }

    async fn make_public(&self, key: &str) -> Result<String, ObjectStoreError> {
        validate_key(key)?;
        let token = self.auth.token().await?;

        let resp = self
            .client
            .post(self.acl_url(key)?)
            .bearer_auth(&token)
            .json(&serde_json::json!({ "entity": "allUsers", "role": "READER" }))
            .send()
            .await
            .map_err(backend)?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        check(resp, "acl update").await?;

        Ok(self.public_url(key)?.to_string())
    }
}
