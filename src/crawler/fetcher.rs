//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with timeouts, proxy and TLS settings
//! - GET requests returning a parsed-later [`Document`]
//! - Retry logic for failed connects
//! - Error classification into recoverable and fatal failures

use crate::config::CrawlerConfig;
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A fetched page: the URL it was requested from and its body.
///
/// HTML is parsed on demand by the extractor so no DOM is held across an
/// await point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub url: String,
    pub body: String,
}

impl Document {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }
}

/// How a failure affects the rest of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Skip the affected item or page and carry on
    Recoverable,
    /// The network path is gone; checkpoint and stop
    Fatal,
}

/// A failed fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection refused/reset, protocol violation or timeout
    #[error("transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Anything else (decode failures, redirect loops, bad URLs)
    #[error("request for {url} failed: {reason}")]
    Other { url: String, reason: String },

    /// A verification page was served instead of content
    #[error("challenge page served at {url} (matched '{marker}')")]
    Challenge {
        url: String,
        marker: String,
        severity: Severity,
    },
}

impl FetchError {
    pub fn severity(&self) -> Severity {
        match self {
            FetchError::Transport { .. } => Severity::Fatal,
            FetchError::Status { .. } | FetchError::Other { .. } => Severity::Recoverable,
            FetchError::Challenge { severity, .. } => *severity,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Connection-level or HTTP status failure, as opposed to a page that
    /// was served but could not be used
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport { .. } | FetchError::Status { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Other { url, .. }
            | FetchError::Challenge { url, .. } => url,
        }
    }
}

/// Retrieves a document for a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client (bad proxy URL, TLS backend)
///
/// # Example
///
/// ```no_run
/// use forum_sweep::config::CrawlerConfig;
/// use forum_sweep::crawler::build_http_client;
///
/// let config = CrawlerConfig {
///     proxy: Some("socks5h://127.0.0.1:9050".to_string()),
///     ..CrawlerConfig::default()
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// Maps a reqwest error onto the crawler's failure taxonomy
///
/// | Condition | Result |
/// |-----------|--------|
/// | Connect refused/reset, timeout | `Transport` (fatal) |
/// | Connection dropped mid-request or mid-body | `Transport` (fatal) |
/// | Non-2xx status | `Status` |
/// | Redirect loop, decode failure, builder error | `Other` |
pub fn classify_error(url: &str, error: &reqwest::Error) -> FetchError {
    if let Some(status) = error.status() {
        return FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        };
    }

    if error.is_redirect() || error.is_builder() || error.is_decode() {
        return FetchError::Other {
            url: url.to_string(),
            reason: error.to_string(),
        };
    }

    if error.is_connect() || error.is_timeout() || error.is_request() || error.is_body() {
        return FetchError::Transport {
            url: url.to_string(),
            reason: error.to_string(),
        };
    }

    FetchError::Other {
        url: url.to_string(),
        reason: error.to_string(),
    }
}

/// Fetcher backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(
            client,
            config.transport_retries,
            Duration::from_millis(config.retry_delay_ms),
        ))
    }

    pub fn with_client(client: Client, retries: u32, retry_delay: Duration) -> Self {
        Self {
            client,
            retries,
            retry_delay,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// Fetches a URL, retrying failed connects
    ///
    /// Only connect failures are retried; everything else is classified and
    /// returned on the first attempt.
    async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        let mut attempt = 0;

        loop {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let response = response
                        .error_for_status()
                        .map_err(|e| classify_error(url, &e))?;
                    let body = response.text().await.map_err(|e| classify_error(url, &e))?;
                    return Ok(Document::new(url, body));
                }
                Err(e) if e.is_connect() && attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Connect to {} failed (attempt {}/{}): {}",
                        url,
                        attempt,
                        self.retries,
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(classify_error(url, &e)),
            }
        }
    }
}
