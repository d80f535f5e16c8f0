//! State module for crawl progress that survives restarts
//!
//! # Components
//!
//! - `CheckpointStore`: the `(job, next_page)` resume pointer
//! - `DedupIndex`: item ids already fetched or scheduled

mod checkpoint;
mod dedup;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use dedup::DedupIndex;
