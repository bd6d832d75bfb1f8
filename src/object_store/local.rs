use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use super::{join_url, validate_key, ObjectStore, ObjectStoreError};

/// Local filesystem object store for development and testing.
/// Objects are "public" by virtue of being served under `public_base_url`.
pub struct LocalStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P, public_base_url: &str) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let path = self.object_path(key)?;
        if !path.is_file() {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let path = self.object_path(key)?;
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn make_public(&self, key: &str) -> Result<String, ObjectStoreError> {
        let path = self.object_path(key)?;
        if !path.is_file() {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        let segments: Vec<&str> = key.split('/').collect();
        Ok(join_url(&self.public_base_url, &segments))
    }
}
