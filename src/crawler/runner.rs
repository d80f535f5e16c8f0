//! Per-job pagination loop
//!
//! A job is one forum section. The runner resolves the section's last page
//! from its first listing page, then walks pages from the job's start page,
//! flushing records and advancing the checkpoint after every page.

use crate::config::CrawlLimits;
use crate::crawler::extractor::ItemExtractor;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::hook::NavigationHook;
use crate::crawler::page::{PageOutcome, PageProcessor, PageRequest};
use crate::record::{forum_label, RecordContext};
use crate::state::{CheckpointStore, DedupIndex};
use crate::storage::RecordSink;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// One listing section to crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Human-readable name for logs and reports
    pub display_name: String,
    /// Path relative to the site base URL; also the checkpoint key
    pub section_identifier: String,
    /// First page to visit, 1-based
    pub start_page: u32,
}

impl Job {
    pub fn new(display_name: impl Into<String>, section_identifier: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            section_identifier: section_identifier.into(),
            start_page: 1,
        }
    }

    pub fn id(&self) -> &str {
        &self.section_identifier
    }
}

/// Site-wide labels and the root URL sections hang off
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub base_url: Url,
    pub source: String,
    pub record_type: String,
    pub section_prefix: String,
}

impl SiteSettings {
    /// Normalises `base_url` to end in `/` so identifiers join beneath it
    pub fn new(
        mut base_url: Url,
        source: impl Into<String>,
        record_type: impl Into<String>,
        section_prefix: impl Into<String>,
    ) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            source: source.into(),
            record_type: record_type.into(),
            section_prefix: section_prefix.into(),
        }
    }

    pub fn section_url(&self, section_identifier: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(section_identifier)
    }
}

/// Listing page URL: the section URL itself for page 1, `?page=N` otherwise
pub fn page_url(section: &Url, page: u32) -> Url {
    let mut url = section.clone();
    if page > 1 {
        url.query_pairs_mut().append_pair("page", &page.to_string());
    }
    url
}

/// Everything a job needs, shared by all jobs of a run
pub struct CrawlContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub extractor: Arc<dyn ItemExtractor>,
    pub hooks: Vec<Arc<dyn NavigationHook>>,
    pub sink: Box<dyn RecordSink>,
    pub checkpoints: CheckpointStore,
    pub dedup: DedupIndex,
    pub site: SiteSettings,
    pub limits: CrawlLimits,
    pub cancel: CancellationToken,
}

impl CrawlContext {
    /// Builds a context with no hooks and no limits; the dedup index is
    /// rehydrated from the sink.
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn ItemExtractor>,
        sink: Box<dyn RecordSink>,
        checkpoints: CheckpointStore,
        site: SiteSettings,
    ) -> Self {
        let dedup = DedupIndex::load_existing(sink.as_ref());
        Self {
            fetcher,
            extractor,
            hooks: Vec::new(),
            sink,
            checkpoints,
            dedup,
            site,
            limits: CrawlLimits::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_limits(mut self, limits: CrawlLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn NavigationHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Why a job stopped paging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    LastPage,
    NoNewItems,
    PageLimit,
    ItemLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::LastPage => "reached last page",
            StopReason::NoNewItems => "page had no new items",
            StopReason::PageLimit => "page limit reached",
            StopReason::ItemLimit => "item limit reached",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Completed(StopReason),
    /// The first listing page could not be fetched
    Skipped,
    Halted,
}

/// Running counters for a job or a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobTotals {
    pub records_saved: usize,
    pub soft_errors: usize,
    pub transport_errors: usize,
    pub pages_visited: usize,
}

impl JobTotals {
    fn absorb(&mut self, outcome: &PageOutcome) {
        self.soft_errors += outcome.soft_errors;
        self.transport_errors += outcome.transport_errors;
        self.pages_visited += 1;
    }

    pub fn merge(&mut self, other: &JobTotals) {
        self.records_saved += other.records_saved;
        self.soft_errors += other.soft_errors;
        self.transport_errors += other.transport_errors;
        self.pages_visited += other.pages_visited;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub display_name: String,
    pub section_identifier: String,
    pub start_page: u32,
    /// Last page advertised by the section, once known
    pub last_page: Option<u32>,
    pub status: JobStatus,
    pub totals: JobTotals,
}

impl JobReport {
    fn new(job: &Job) -> Self {
        Self {
            display_name: job.display_name.clone(),
            section_identifier: job.section_identifier.clone(),
            start_page: job.start_page,
            last_page: None,
            status: JobStatus::Completed(StopReason::LastPage),
            totals: JobTotals::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// A listing fetch failed in a way that means the network path is gone
    Fatal(String),
    /// The sink rejected a page of records
    Storage(String),
    /// Cancelled from outside (Ctrl-C)
    Interrupted,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::Fatal(reason) => write!(f, "fatal fetch error: {}", reason),
            HaltReason::Storage(reason) => write!(f, "storage error: {}", reason),
            HaltReason::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// The run cannot continue. `page` is where the next run resumes.
#[derive(Debug, Clone, Error)]
#[error("halted in '{job_id}' at page {page}: {reason}")]
pub struct Halt {
    pub job_id: String,
    pub page: u32,
    pub reason: HaltReason,
    pub report: JobReport,
}

/// Runs one job to completion or until the run must halt
///
/// # Loop
///
/// 1. Fetch page 1 to learn the last page number
/// 2. For each page from `start_page` to the last page:
///    - stop when the page or item cap for this run is reached
///    - process the listing page and its new items
///    - on a fatal listing failure: checkpoint this page and halt
///    - append the page's records to the sink, then checkpoint the next page
///    - stop after a page with no new items unless configured otherwise
///
/// Cancellation halts without touching the checkpoint, so the next run
/// redoes the current page.
pub async fn run_job(ctx: &mut CrawlContext, job: &Job) -> Result<JobReport, Halt> {
    tracing::info!("[+] Starting section '{}'", job.display_name);
    let mut report = JobReport::new(job);

    let section = match ctx.site.section_url(&job.section_identifier) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(
                "[!] Cannot build a URL for section '{}': {}. Skipping",
                job.section_identifier,
                e
            );
            report.status = JobStatus::Skipped;
            return Ok(report);
        }
    };

    let processor = PageProcessor {
        fetcher: ctx.fetcher.as_ref(),
        extractor: ctx.extractor.as_ref(),
        hooks: &ctx.hooks,
        cancel: &ctx.cancel,
    };

    let first_url = page_url(&section, 1);
    let first = tokio::select! {
        result = processor.navigate(first_url.as_str()) => result,
        _ = ctx.cancel.cancelled() => {
            report.status = JobStatus::Halted;
            return Err(halt(job, job.start_page, HaltReason::Interrupted, report));
        }
    };

    let first = match first {
        Ok(document) => document,
        Err(e) if e.is_fatal() => {
            tracing::error!("[!] Fatal error opening section '{}': {}", job.display_name, e);
            ctx.checkpoints.save(job.id(), job.start_page);
            report.status = JobStatus::Halted;
            report.totals.transport_errors += 1;
            return Err(halt(
                job,
                job.start_page,
                HaltReason::Fatal(e.to_string()),
                report,
            ));
        }
        Err(e) => {
            tracing::warn!("[!] Could not open section '{}': {}. Skipping", job.display_name, e);
            report.status = JobStatus::Skipped;
            report.totals.transport_errors += 1;
            return Ok(report);
        }
    };

    let last_page = ctx.extractor.last_page_number(&first);
    report.last_page = Some(last_page);
    tracing::info!("  - Section '{}' has {} pages", job.display_name, last_page);
    if job.start_page > 1 {
        tracing::info!("  - Resuming at page {}", job.start_page);
    }

    let forum = forum_label(&job.section_identifier, &ctx.site.section_prefix);
    let limits = ctx.limits;
    let mut page = job.start_page;

    while page <= last_page {
        if let Some(max_items) = limits.max_items_per_job {
            if report.totals.records_saved >= max_items {
                report.status = JobStatus::Completed(StopReason::ItemLimit);
                break;
            }
        }

        if let Some(max_pages) = limits.max_pages_per_job {
            if page - job.start_page + 1 > max_pages {
                report.status = JobStatus::Completed(StopReason::PageLimit);
                break;
            }
        }

        let url = page_url(&section, page);
        let context = RecordContext::new(
            &ctx.site.source,
            &ctx.site.record_type,
            &forum,
            Utc::now(),
        );
        let item_budget = limits
            .max_items_per_job
            .map(|max| max.saturating_sub(report.totals.records_saved));

        let outcome = processor
            .process(
                &mut ctx.dedup,
                PageRequest {
                    url: url.as_str(),
                    context: &context,
                    item_budget,
                },
            )
            .await;

        if outcome.interrupted {
            tracing::warn!("[!] Interrupted on page {} of '{}'", page, job.display_name);
            report.status = JobStatus::Halted;
            return Err(halt(job, page, HaltReason::Interrupted, report));
        }

        if outcome.fatal {
            ctx.checkpoints.save(job.id(), page);
            report.totals.absorb(&outcome);
            report.status = JobStatus::Halted;
            return Err(halt(
                job,
                page,
                HaltReason::Fatal(format!("listing page {} unreachable", url)),
                report,
            ));
        }

        if !outcome.records.is_empty() {
            if let Err(e) = ctx.sink.append(&outcome.records) {
                tracing::error!("[!] Failed to save records from page {}: {}", page, e);
                ctx.checkpoints.save(job.id(), page);
                report.totals.absorb(&outcome);
                report.status = JobStatus::Halted;
                return Err(halt(job, page, HaltReason::Storage(e.to_string()), report));
            }
        }

        report.totals.absorb(&outcome);
        report.totals.records_saved += outcome.records.len();
        ctx.checkpoints.save(job.id(), page + 1);

        if !outcome.new_items_found && !limits.keep_scanning_duplicates {
            tracing::info!("  - No new items on page {}, stopping section", page);
            report.status = JobStatus::Completed(StopReason::NoNewItems);
            break;
        }

        page += 1;
    }

    tracing::info!(
        "[+] Finished section '{}': {} records, {} soft errors, {} fetch errors ({})",
        job.display_name,
        report.totals.records_saved,
        report.totals.soft_errors,
        report.totals.transport_errors,
        match report.status {
            JobStatus::Completed(reason) => reason.to_string(),
            _ => "stopped".to_string(),
        }
    );

    Ok(report)
}

fn halt(job: &Job, page: u32, reason: HaltReason, report: JobReport) -> Halt {
    Halt {
        job_id: job.id().to_string(),
        page,
        reason,
        report,
    }
}
