use async_trait::async_trait;

use super::db::{Database, DatabaseError};
use super::models::{NewNote, NoteRecord};
use super::tables::*;
use super::{NoteStore, StoreError};

impl Database {
    // ========================================================================
    // Note operations
    // ========================================================================

    /// Store a note record under its id
    pub fn put_note(&self, note: &NoteRecord) -> Result<(), DatabaseError> {
        debug_assert!(!note.id.is_empty(), "note id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(NOTES)?;
            let data = rmp_serde::to_vec_named(note)?;
            table.insert(note.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a note by id
    pub fn get_note(&self, id: &str) -> Result<Option<NoteRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(NOTES)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl NoteStore for Database {
    async fn insert_note(&self, note: NewNote) -> Result<String, StoreError> {
        let record = note.with_id(Database::new_id());
        self.put_note(&record)?;
        Ok(record.id)
    }

    async fn get_note(&self, id: &str) -> Result<Option<NoteRecord>, StoreError> {
        Ok(Database::get_note(self, id)?)
    }
}
