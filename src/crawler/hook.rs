//! Post-navigation hooks
//!
//! A hook inspects every fetched document before it reaches the extractor
//! and can veto it. The built-in [`ChallengeHook`] recognises verification
//! pages (captchas, "checking your browser" interstitials) served in place
//! of real content.

use crate::config::ChallengeConfig;
use crate::crawler::fetcher::{Document, FetchError, Severity};

/// Inspects a document after navigation
pub trait NavigationHook: Send + Sync {
    /// Returns an error to reject the document
    fn after_navigation(&self, document: &Document) -> Result<(), FetchError>;
}

/// Rejects documents containing any configured challenge marker
#[derive(Debug, Clone)]
pub struct ChallengeHook {
    markers: Vec<String>,
    severity: Severity,
}

impl ChallengeHook {
    pub fn new(config: &ChallengeConfig) -> Self {
        Self {
            markers: config.markers.iter().map(|m| m.to_lowercase()).collect(),
            severity: if config.halt {
                Severity::Fatal
            } else {
                Severity::Recoverable
            },
        }
    }
}

impl NavigationHook for ChallengeHook {
    fn after_navigation(&self, document: &Document) -> Result<(), FetchError> {
        if self.markers.is_empty() {
            return Ok(());
        }

        let body = document.body.to_lowercase();
        match self.markers.iter().find(|marker| body.contains(marker.as_str())) {
            Some(marker) => {
                tracing::warn!("Challenge page detected at {} ('{}')", document.url, marker);
                Err(FetchError::Challenge {
                    url: document.url.clone(),
                    marker: marker.clone(),
                    severity: self.severity,
                })
            }
            None => Ok(()),
        }
    }
}
