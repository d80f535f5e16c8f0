//! Crawler module for paginated forum sections
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with transport-failure classification
//! - Listing and detail extraction
//! - Per-page processing with concurrent detail fetches
//! - The per-job pagination loop and the run-level job queue
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod hook;
mod page;
mod probe;
mod queue;
mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{run_crawl, Coordinator};
pub use extractor::{ItemExtractor, ItemReference, SelectorExtractor};
pub use fetcher::{
    build_http_client, classify_error, Document, FetchError, Fetcher, HttpFetcher, Severity,
};
pub use hook::{ChallengeHook, NavigationHook};
pub use page::{PageOutcome, PageProcessor, PageRequest};
pub use probe::{HttpProbe, ReachabilityProbe};
pub use queue::{JobQueue, RunReport, RunStatus, Task};
pub use runner::{
    page_url, run_job, CrawlContext, Halt, HaltReason, Job, JobReport, JobStatus, JobTotals,
    SiteSettings, StopReason,
};

use crate::config::Config;
use crate::SweepError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the record sink and rehydrate the dedup index
/// 2. Load the resume checkpoint (unless `fresh`)
/// 3. Check the network path, when configured
/// 4. Crawl each section in order, checkpointing after every page
/// 5. Write the run report
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Discard any resume checkpoint first
///
/// # Returns
///
/// * `Ok(RunReport)` - The run finished, halted or was interrupted
/// * `Err(SweepError)` - The run could not be set up
pub async fn crawl(config: Config, fresh: bool) -> Result<RunReport, SweepError> {
    run_crawl(config, fresh).await
}
