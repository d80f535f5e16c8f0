//! Storage traits and error types
//!
//! The crawler only needs two things from its output: append a batch of
//! records, and list the ids already written so they are not fetched again.

use crate::record::Record;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Append-only destination for extracted records
pub trait RecordSink: Send {
    /// Appends a batch of records.
    ///
    /// Records whose id is already stored are ignored. Returns the number of
    /// rows actually written.
    fn append(&mut self, records: &[Record]) -> StorageResult<usize>;

    /// Lists every non-empty record id already in the sink
    fn load_ids(&self) -> StorageResult<HashSet<String>>;
}
