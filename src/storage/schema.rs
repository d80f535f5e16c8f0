//! Database schema definitions
//!
//! The `records` table mirrors the union schema column-for-column.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per extracted item, append-only
CREATE TABLE IF NOT EXISTS records (
    source TEXT NOT NULL DEFAULT '',
    record_type TEXT NOT NULL DEFAULT '',
    id TEXT NOT NULL UNIQUE,
    company TEXT NOT NULL DEFAULT '',
    website TEXT NOT NULL DEFAULT '',
    country TEXT NOT NULL DEFAULT '',
    address TEXT NOT NULL DEFAULT '',
    size_bytes TEXT NOT NULL DEFAULT '',
    size_gib TEXT NOT NULL DEFAULT '',
    is_published TEXT NOT NULL DEFAULT '',
    time_until_publication TEXT NOT NULL DEFAULT '',
    posted_at_utc TEXT NOT NULL DEFAULT '',
    crawled_at_utc TEXT NOT NULL DEFAULT '',
    crawled_at_kst TEXT NOT NULL DEFAULT '',
    ransomware_group TEXT NOT NULL DEFAULT '',
    discovery_date TEXT NOT NULL DEFAULT '',
    estimated_attack_date TEXT NOT NULL DEFAULT '',
    details_url TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    files_api_present TEXT NOT NULL DEFAULT '',
    forum TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL DEFAULT '',
    author TEXT NOT NULL DEFAULT '',
    last_edited_info TEXT NOT NULL DEFAULT '',
    author_rank TEXT NOT NULL DEFAULT '',
    reputation TEXT NOT NULL DEFAULT '',
    posts_count TEXT NOT NULL DEFAULT '',
    threads_count TEXT NOT NULL DEFAULT '',
    join_date TEXT NOT NULL DEFAULT '',
    main_content TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_records_forum ON records(forum);
CREATE INDEX IF NOT EXISTS idx_records_source ON records(source);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
