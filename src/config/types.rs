use serde::Deserialize;

/// Main configuration structure for forum-sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub reachability: Option<ReachabilityConfig>,
    pub output: OutputConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub challenge: Option<ChallengeConfig>,
    #[serde(default, rename = "section")]
    pub sections: Vec<SectionEntry>,
}

/// The site being crawled and how its records are labelled
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root URL that section identifiers are resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Value written to the `source` column
    pub source: String,

    /// Value written to the `record_type` column
    #[serde(rename = "record-type", default = "default_record_type")]
    pub record_type: String,

    /// Prefix stripped from section identifiers to build the `forum` column
    #[serde(rename = "section-prefix", default)]
    pub section_prefix: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// TCP/TLS connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How many times a failed connect is retried before it is reported
    #[serde(rename = "transport-retries", default = "default_transport_retries")]
    pub transport_retries: u32,

    /// Pause between transport retries (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Optional proxy, e.g. `socks5h://127.0.0.1:9050` for Tor
    #[serde(default)]
    pub proxy: Option<String>,

    /// Skip TLS certificate verification
    #[serde(rename = "accept-invalid-certs", default)]
    pub accept_invalid_certs: bool,

    /// Overrides the default User-Agent header
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,

    /// Maximum listing pages visited per job in one run
    #[serde(rename = "max-pages-per-job", default)]
    pub max_pages_per_job: Option<u32>,

    /// Maximum records saved per job in one run
    #[serde(rename = "max-items-per-job", default)]
    pub max_items_per_job: Option<usize>,

    /// Keep paging past a listing page that holds only known items
    #[serde(rename = "keep-scanning-duplicates", default)]
    pub keep_scanning_duplicates: bool,
}

impl CrawlerConfig {
    /// Collects the per-job caps into the form the job runner consumes
    pub fn limits(&self) -> CrawlLimits {
        CrawlLimits {
            max_pages_per_job: self.max_pages_per_job,
            max_items_per_job: self.max_items_per_job,
            keep_scanning_duplicates: self.keep_scanning_duplicates,
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            transport_retries: default_transport_retries(),
            retry_delay_ms: default_retry_delay(),
            proxy: None,
            accept_invalid_certs: false,
            user_agent: None,
            max_pages_per_job: None,
            max_items_per_job: None,
            keep_scanning_duplicates: false,
        }
    }
}

/// Per-job caps and the duplicate-page stop toggle.
///
/// The toggle applies to every job in the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlLimits {
    pub max_pages_per_job: Option<u32>,
    pub max_items_per_job: Option<usize>,
    pub keep_scanning_duplicates: bool,
}

/// Network reachability probe executed before any job
#[derive(Debug, Clone, Deserialize)]
pub struct ReachabilityConfig {
    pub url: String,

    /// Require `"IsTor": true` in the JSON response
    #[serde(rename = "require-tor", default)]
    pub require_tor: bool,

    #[serde(rename = "timeout-secs", default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding extracted records
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the JSON resume checkpoint
    #[serde(rename = "checkpoint-path", default = "default_checkpoint_path")]
    pub checkpoint_path: String,

    /// Path to the markdown run report
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

/// CSS selectors used by the default extractor.
///
/// Defaults match MyBB-based boards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    #[serde(rename = "item-link")]
    pub item_link: String,
    pub pagination: String,
    #[serde(rename = "pagination-last")]
    pub pagination_last: String,
    #[serde(rename = "pagination-page")]
    pub pagination_page: String,
    #[serde(rename = "first-post")]
    pub first_post: String,
    pub title: String,
    pub author: String,
    #[serde(rename = "posted-date")]
    pub posted_date: String,
    #[serde(rename = "last-edited")]
    pub last_edited: String,
    pub content: String,
    #[serde(rename = "author-rank")]
    pub author_rank: String,
    pub reputation: String,
    #[serde(rename = "author-stat")]
    pub author_stat: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            item_link: "span[id^='tid_'] a".to_string(),
            pagination: "div.pagination".to_string(),
            pagination_last: "a.pagination_last".to_string(),
            pagination_page: "a.pagination_page".to_string(),
            first_post: "#posts > .post.classic:first-of-type".to_string(),
            title: ".thread-info__name".to_string(),
            author: ".post_user-profile a".to_string(),
            posted_date: ".post_date".to_string(),
            last_edited: ".post_edit em".to_string(),
            content: ".post_body".to_string(),
            author_rank: ".post_user-title".to_string(),
            reputation: ".reputation_positive, .reputation_neutral, .reputation_negative"
                .to_string(),
            author_stat: ".post_author-stats .post_stats-bit.group".to_string(),
        }
    }
}

/// Verification/challenge page detection
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeConfig {
    /// Case-insensitive substrings that identify a challenge page
    pub markers: Vec<String>,

    /// Halt the run when a challenge is served instead of skipping the fetch
    #[serde(default)]
    pub halt: bool,
}

/// One listing section to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct SectionEntry {
    /// Human-readable name used in logs and reports
    pub name: String,

    /// Path of the section relative to the site base URL; stable across runs
    pub identifier: String,
}

fn default_record_type() -> String {
    "leak_post".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    15
}

fn default_transport_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2000
}

fn default_probe_timeout() -> u64 {
    15
}

fn default_checkpoint_path() -> String {
    "crawl_state.json".to_string()
}
