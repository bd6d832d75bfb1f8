use async_trait::async_trait;

use super::db::{Database, DatabaseError};
use super::models::{DocumentRecord, NewDocument};
use super::tables::*;
use super::{DocumentStore, StoreError};

impl Database {
    // ========================================================================
    // Accessibility document operations
    // ========================================================================

    pub fn put_document(&self, doc: &DocumentRecord) -> Result<(), DatabaseError> {
        debug_assert!(!doc.id.is_empty(), "document id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(DOCUMENTS)?;
            let data = rmp_serde::to_vec_named(doc)?;
            table.insert(doc.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DocumentStore for Database {
    async fn insert_document(&self, doc: NewDocument) -> Result<String, StoreError> {
        let record = doc.with_id(Database::new_id());
        self.put_document(&record)?;
        Ok(record.id)
    }
}
