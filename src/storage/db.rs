use redb::{Database as RedbDatabase, ReadTransaction, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::tables::*;

const DB_FILE: &str = "study-notes.redb";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Record store error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Unreadable record: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unencodable record: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
}

// redb splits its errors by phase; callers only care that the store failed
macro_rules! redb_error {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for DatabaseError {
                fn from(e: $ty) -> Self {
                    DatabaseError::Redb(Box::new(e.into()))
                }
            }
        )+
    };
}

redb_error!(
    redb::Error,
    redb::CommitError,
    redb::DatabaseError,
    redb::StorageError,
    redb::TableError,
    redb::TransactionError,
);

/// Embedded redb file holding notes and documents for the `local` backends.
#[derive(Clone)]
pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Database {
    /// Open `<data_dir>/study-notes.redb`, creating the directory, the file
    /// and both tables as needed.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db = Arc::new(RedbDatabase::create(data_dir.as_ref().join(DB_FILE))?);

        let write_txn = db.begin_write()?;
        write_txn.open_table(NOTES)?;
        write_txn.open_table(DOCUMENTS)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(crate) fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    pub(crate) fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }

    /// Fresh record id for locally stored records.
    pub(crate) fn new_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}
