//! Statistics over the record database
//!
//! Backs the `--stats` command: what has been collected so far, per forum
//! and per source.

use crate::storage::{SqliteStorage, StorageResult};

/// Record database summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStatistics {
    pub total_records: u64,

    /// Records per `forum` column value, largest first
    pub by_forum: Vec<(String, u64)>,

    /// Records per `source` column value, largest first
    pub by_source: Vec<(String, u64)>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The record database to query
///
/// # Returns
///
/// * `Ok(RecordStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query the database
pub fn load_statistics(storage: &SqliteStorage) -> StorageResult<RecordStatistics> {
    Ok(RecordStatistics {
        total_records: storage.count_records()?,
        by_forum: storage.count_by_forum()?,
        by_source: storage.count_by_source()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RecordStatistics) {
    println!("=== Record Statistics ===\n");
    println!("Total records: {}", stats.total_records);
    println!();

    print_breakdown("Records by Source", &stats.by_source, stats.total_records);
    print_breakdown("Records by Forum", &stats.by_forum, stats.total_records);
}

fn print_breakdown(title: &str, counts: &[(String, u64)], total: u64) {
    if counts.is_empty() {
        return;
    }

    println!("{}:", title);
    for (key, count) in counts {
        let percentage = if total > 0 {
            (*count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let key = if key.is_empty() { "(none)" } else { key.as_str() };
        println!("  {}: {} ({:.1}%)", key, count, percentage);
    }
    println!();
}
