//! One listing page: fetch it, schedule unseen items, fetch their details
//! concurrently and fold the results into a [`PageOutcome`].

use crate::crawler::extractor::ItemExtractor;
use crate::crawler::fetcher::{Document, FetchError, Fetcher};
use crate::crawler::hook::NavigationHook;
use crate::record::{Record, RecordContext};
use crate::state::DedupIndex;
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of processing a single listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOutcome {
    /// Successfully extracted records, stamped with the page context
    pub records: Vec<Record>,
    /// At least one item on the page was not in the dedup index
    pub new_items_found: bool,
    /// Detail pages that produced a record
    pub processed_count: usize,
    /// Detail pages that yielded no record: extraction misses, challenge
    /// pages and undecodable responses
    pub soft_errors: usize,
    /// Detail fetches lost to a transport failure or an HTTP error status
    pub transport_errors: usize,
    /// The listing fetch failed fatally; nothing else was attempted
    pub fatal: bool,
    /// The run was cancelled while this page was in flight
    pub interrupted: bool,
}

impl PageOutcome {
    fn fatal() -> Self {
        Self {
            fatal: true,
            transport_errors: 1,
            ..Self::default()
        }
    }

    fn interrupted(new_items_found: bool) -> Self {
        Self {
            interrupted: true,
            new_items_found,
            ..Self::default()
        }
    }
}

/// Inputs for one listing page
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub url: &'a str,
    pub context: &'a RecordContext,
    /// Items that may still be scheduled before the job's item cap
    pub item_budget: Option<usize>,
}

enum ItemResult {
    Extracted(Record),
    NotExtracted,
    Failed(FetchError),
}

/// Borrowed view over the crawl collaborators needed for one page
pub struct PageProcessor<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub extractor: &'a dyn ItemExtractor,
    pub hooks: &'a [Arc<dyn NavigationHook>],
    pub cancel: &'a CancellationToken,
}

impl<'a> PageProcessor<'a> {
    /// Fetches a URL and runs every hook over the result
    pub async fn navigate(&self, url: &str) -> Result<Document, FetchError> {
        let document = self.fetcher.fetch(url).await?;
        for hook in self.hooks {
            hook.after_navigation(&document)?;
        }
        Ok(document)
    }

    /// Processes one listing page.
    ///
    /// Items are marked seen in `dedup` when scheduled, so a detail fetch
    /// that fails is not retried later in the run. Never returns an error:
    /// every failure is folded into the outcome.
    pub async fn process(&self, dedup: &mut DedupIndex, request: PageRequest<'_>) -> PageOutcome {
        tracing::info!("  - Visiting listing page: {}", request.url);

        let listing = tokio::select! {
            result = self.navigate(request.url) => result,
            _ = self.cancel.cancelled() => return PageOutcome::interrupted(false),
        };

        let listing = match listing {
            Ok(document) => document,
            Err(e) if e.is_fatal() => {
                tracing::error!("  - Fatal error on listing page: {}", e);
                return PageOutcome::fatal();
            }
            Err(e) => {
                tracing::warn!("  - Skipping listing page: {}", e);
                return PageOutcome {
                    transport_errors: 1,
                    ..PageOutcome::default()
                };
            }
        };

        let refs = self.extractor.extract_item_refs(&listing);
        if refs.is_empty() {
            tracing::info!("  - No items found on {}", request.url);
            return PageOutcome::default();
        }

        let mut new_items_found = false;
        let mut scheduled = Vec::new();
        for item in refs {
            if dedup.contains(&item.url) {
                continue;
            }
            new_items_found = true;

            if let Some(budget) = request.item_budget {
                if scheduled.len() >= budget {
                    tracing::info!("  - Item limit reached, leaving remaining items for later");
                    break;
                }
            }

            dedup.add(item.url.clone());
            scheduled.push(item.url);
        }

        if scheduled.is_empty() {
            tracing::info!("  - Every item on {} is already known", request.url);
            return PageOutcome {
                new_items_found,
                ..PageOutcome::default()
            };
        }

        tracing::info!("  - Fetching {} new items concurrently", scheduled.len());
        let fetches = scheduled.iter().map(|url| self.fetch_item(url));
        let results = tokio::select! {
            results = join_all(fetches) => results,
            _ = self.cancel.cancelled() => {
                tracing::warn!("  - Interrupted with {} item fetches in flight", scheduled.len());
                return PageOutcome::interrupted(new_items_found);
            }
        };

        let mut outcome = PageOutcome {
            new_items_found,
            ..PageOutcome::default()
        };

        for result in results {
            match result {
                ItemResult::Extracted(record) => {
                    outcome.records.push(record.stamp(request.context));
                }
                ItemResult::NotExtracted => outcome.soft_errors += 1,
                ItemResult::Failed(e) if e.is_transport() => {
                    tracing::warn!("    - Item fetch failed: {}", e);
                    outcome.transport_errors += 1;
                }
                ItemResult::Failed(e) => {
                    tracing::warn!("    - Item skipped: {}", e);
                    outcome.soft_errors += 1;
                }
            }
        }
        outcome.processed_count = outcome.records.len();

        tracing::info!(
            "  - Page done: {} records, {} soft errors, {} fetch errors",
            outcome.records.len(),
            outcome.soft_errors,
            outcome.transport_errors
        );
        outcome
    }

    async fn fetch_item(&self, url: &str) -> ItemResult {
        match self.navigate(url).await {
            Ok(document) => match self.extractor.extract_record(&document) {
                Some(record) => ItemResult::Extracted(record),
                None => ItemResult::NotExtracted,
            },
            Err(e) => ItemResult::Failed(e),
        }
    }
}
