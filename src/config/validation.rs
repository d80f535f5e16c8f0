use crate::config::types::{
    ChallengeConfig, Config, CrawlerConfig, OutputConfig, ReachabilityConfig, SectionEntry,
    SelectorConfig, SiteConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    if let Some(reachability) = &config.reachability {
        validate_reachability_config(reachability)?;
    }
    validate_output_config(&config.output)?;
    validate_selectors(&config.selectors)?;
    if let Some(challenge) = &config.challenge {
        validate_challenge_config(challenge)?;
    }
    validate_sections(&config.sections)?;
    Ok(())
}

/// Validates the site block
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.source.trim().is_empty() {
        return Err(ConfigError::Validation(
            "site source cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.max_pages_per_job == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages-per-job must be >= 1 when set".to_string(),
        ));
    }

    if config.max_items_per_job == Some(0) {
        return Err(ConfigError::Validation(
            "max-items-per-job must be >= 1 when set".to_string(),
        ));
    }

    if let Some(proxy) = &config.proxy {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;

        if !matches!(url.scheme(), "http" | "https" | "socks5" | "socks5h") {
            return Err(ConfigError::InvalidUrl(format!(
                "proxy '{}' must use http, https, socks5 or socks5h",
                proxy
            )));
        }
    }

    Ok(())
}

/// Validates the reachability probe
fn validate_reachability_config(config: &ReachabilityConfig) -> Result<(), ConfigError> {
    Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid reachability url: {}", e)))?;

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "reachability timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint-path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Checks that every configured selector parses
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    let selectors = [
        ("item-link", &config.item_link),
        ("pagination", &config.pagination),
        ("pagination-last", &config.pagination_last),
        ("pagination-page", &config.pagination_page),
        ("first-post", &config.first_post),
        ("title", &config.title),
        ("author", &config.author),
        ("posted-date", &config.posted_date),
        ("last-edited", &config.last_edited),
        ("content", &config.content),
        ("author-rank", &config.author_rank),
        ("reputation", &config.reputation),
        ("author-stat", &config.author_stat),
    ];

    for (name, css) in selectors {
        validate_selector(name, css)?;
    }

    Ok(())
}

/// Parses a single CSS selector, mapping failures to a config error
pub(crate) fn validate_selector(name: &str, css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css)
        .map_err(|e| ConfigError::InvalidSelector(format!("{} selector '{}': {:?}", name, css, e)))
}

/// Validates challenge detection
fn validate_challenge_config(config: &ChallengeConfig) -> Result<(), ConfigError> {
    if config.markers.iter().any(|m| m.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "challenge markers cannot be empty strings".to_string(),
        ));
    }
    Ok(())
}

/// Validates the ordered section list
fn validate_sections(sections: &[SectionEntry]) -> Result<(), ConfigError> {
    if sections.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[section]] must be configured".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in sections {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "section '{}' has an empty name",
                entry.identifier
            )));
        }

        if entry.identifier.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "section '{}' has an empty identifier",
                entry.name
            )));
        }

        if !seen.insert(entry.identifier.as_str()) {
            return Err(ConfigError::Validation(format!(
                "section identifier '{}' is listed more than once",
                entry.identifier
            )));
        }
    }

    Ok(())
}
