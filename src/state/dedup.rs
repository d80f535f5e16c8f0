//! In-memory index of item ids that must not be fetched again

use crate::storage::RecordSink;
use std::collections::HashSet;

/// Set of already-seen item identifiers (detail URLs).
///
/// Only grows. Ids are added when a fetch is scheduled, before it completes.
#[derive(Debug, Clone, Default)]
pub struct DedupIndex {
    seen: HashSet<String>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrates the index from records already in the sink.
    ///
    /// An unreadable sink yields an empty index.
    pub fn load_existing(sink: &dyn RecordSink) -> Self {
        match sink.load_ids() {
            Ok(seen) => {
                tracing::info!("Loaded {} existing item ids from the sink", seen.len());
                Self { seen }
            }
            Err(e) => {
                tracing::error!("Failed to read existing ids: {}. Starting with an empty index", e);
                Self::default()
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Returns true when `id` was not present before
    pub fn add(&mut self, id: impl Into<String>) -> bool {
        self.seen.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for DedupIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            seen: iter.into_iter().map(Into::into).collect(),
        }
    }
}
