//! Storage module for persisting extracted records
//!
//! This module handles the output sink:
//! - SQLite database initialization and schema management
//! - Append-only record writes with id-level deduplication
//! - Reading back ids and aggregate counts

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{RecordSink, StorageError, StorageResult};

use std::path::Path;

/// Initializes or opens the record database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}
