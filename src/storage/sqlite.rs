//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordSink trait.

use crate::record::{Record, UNIFIED_FIELDS};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordSink, StorageResult};
use rusqlite::{params_from_iter, Connection};
use std::collections::HashSet;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    insert_sql: String,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`, creating parent directories
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Self::with_connection(conn)
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            insert_sql: build_insert_sql(),
        })
    }

    /// Counts all stored records
    pub fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Record counts grouped by the `forum` column, largest first
    pub fn count_by_forum(&self) -> StorageResult<Vec<(String, u64)>> {
        self.grouped_counts("forum")
    }

    /// Record counts grouped by the `source` column, largest first
    pub fn count_by_source(&self) -> StorageResult<Vec<(String, u64)>> {
        self.grouped_counts("source")
    }

    fn grouped_counts(&self, column: &str) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {col}, COUNT(*) AS n FROM records GROUP BY {col} ORDER BY n DESC, {col} ASC",
            col = column
        ))?;

        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((key, count as u64))
        })?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    /// Loads every record in insertion order
    pub fn load_records(&self) -> StorageResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM records ORDER BY rowid",
            UNIFIED_FIELDS.join(", ")
        ))?;

        let rows = stmt.query_map([], |row| {
            let mut values = Vec::with_capacity(UNIFIED_FIELDS.len());
            for idx in 0..UNIFIED_FIELDS.len() {
                values.push(row.get::<_, String>(idx)?);
            }
            Ok(Record::from_values(values))
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

impl RecordSink for SqliteStorage {
    fn append(&mut self, records: &[Record]) -> StorageResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for record in records {
                written += stmt.execute(params_from_iter(record.values()))?;
            }
        }
        tx.commit()?;

        tracing::info!("[+] Appended {} records to the sink", written);
        Ok(written)
    }

    fn load_ids(&self) -> StorageResult<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM records WHERE id <> ''")?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut ids = HashSet::new();
        for row in rows {
            ids.insert(row?);
        }
        Ok(ids)
    }
}

fn build_insert_sql() -> String {
    let placeholders: Vec<String> = (1..=UNIFIED_FIELDS.len())
        .map(|i| format!("?{}", i))
        .collect();
    format!(
        "INSERT OR IGNORE INTO records ({}) VALUES ({})",
        UNIFIED_FIELDS.join(", "),
        placeholders.join(", ")
    )
}
