//! Crawler coordinator - wires a configuration into a runnable crawl
//!
//! This module builds the concrete collaborators for a run:
//! - The HTTP fetcher and, when configured, the reachability probe
//! - The selector-driven extractor and challenge hook
//! - The SQLite sink, dedup index and checkpoint store
//! - The job queue, one job per configured section
//!
//! It also installs the Ctrl-C handler and writes the run report.

use crate::config::Config;
use crate::crawler::extractor::SelectorExtractor;
use crate::crawler::fetcher::HttpFetcher;
use crate::crawler::hook::ChallengeHook;
use crate::crawler::probe::HttpProbe;
use crate::crawler::queue::{JobQueue, RunReport};
use crate::crawler::runner::{CrawlContext, Job, SiteSettings};
use crate::output::write_markdown_report;
use crate::state::CheckpointStore;
use crate::storage::SqliteStorage;
use crate::SweepError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator {
    queue: JobQueue,
    context: CrawlContext,
    summary_path: PathBuf,
    source: String,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fresh` - Discard any resume checkpoint and start from the first section
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(SweepError)` - Failed to open storage or build the HTTP client
    pub fn new(config: Config, fresh: bool) -> Result<Self, SweepError> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

        let checkpoints = CheckpointStore::new(&config.output.checkpoint_path);
        if fresh {
            tracing::info!("Fresh run requested, discarding checkpoint");
            checkpoints.clear();
        }

        let fetcher = HttpFetcher::new(&config.crawler)?;
        let extractor = SelectorExtractor::new(&config.selectors)?;

        let site = SiteSettings::new(
            Url::parse(&config.site.base_url)?,
            config.site.source.as_str(),
            config.site.record_type.as_str(),
            config.site.section_prefix.as_str(),
        );

        let mut queue = JobQueue::new();
        if let Some(reachability) = &config.reachability {
            queue.register_check(Arc::new(HttpProbe::new(
                fetcher.client().clone(),
                reachability.clone(),
            )));
        }
        for section in &config.sections {
            queue.register(Job::new(section.name.as_str(), section.identifier.as_str()));
        }

        let mut context = CrawlContext::new(
            Arc::new(fetcher),
            Arc::new(extractor),
            Box::new(storage),
            checkpoints,
            site,
        )
        .with_limits(config.crawler.limits());

        if let Some(challenge) = &config.challenge {
            context = context.with_hook(Arc::new(ChallengeHook::new(challenge)));
        }

        Ok(Self {
            queue,
            context,
            summary_path: PathBuf::from(&config.output.summary_path),
            source: config.site.source,
        })
    }

    /// Token that stops the run when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.context.cancel.clone()
    }

    /// Runs every queued task and writes the markdown report
    ///
    /// Halts are reported through [`RunReport::status`], not as errors.
    pub async fn run(mut self) -> Result<RunReport, SweepError> {
        tracing::info!(
            "Starting crawl of {} ({} sections, {} known items)",
            self.source,
            self.queue.jobs().count(),
            self.context.dedup.len()
        );

        let listener = spawn_interrupt_listener(self.context.cancel.clone());
        let report = self.queue.run(&mut self.context).await;
        listener.abort();

        if let Err(e) = write_markdown_report(&report, &self.source, &self.summary_path) {
            tracing::error!(
                "Failed to write run report to {}: {}",
                self.summary_path.display(),
                e
            );
        }

        Ok(report)
    }
}

/// Cancels `token` on the first Ctrl-C
fn spawn_interrupt_listener(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after in-flight work is dropped");
            token.cancel();
        }
    })
}

/// Runs a complete crawl operation
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Discard any resume checkpoint first
///
/// # Example
///
/// ```no_run
/// use forum_sweep::config::load_config;
/// use forum_sweep::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("sweep.toml"))?;
/// let report = run_crawl(config, false).await?;
/// println!("{:?}", report.status);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, fresh: bool) -> Result<RunReport, SweepError> {
    Coordinator::new(config, fresh)?.run().await
}
