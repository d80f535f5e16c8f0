//! HTML extraction for listing and detail pages
//!
//! This module turns fetched documents into:
//! - Item references (detail URLs) found on a listing page
//! - The last page number advertised by a listing's pagination
//! - One [`Record`] per detail page

use crate::config::{validate_selector, SelectorConfig};
use crate::crawler::fetcher::Document;
use crate::record::{normalize_posted_at, Record};
use crate::ConfigError;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A detail page discovered on a listing page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemReference {
    /// Absolute detail URL; doubles as the item id
    pub url: String,
}

/// Site-specific extraction strategy
pub trait ItemExtractor: Send + Sync {
    /// Detail references in page order
    fn extract_item_refs(&self, listing: &Document) -> Vec<ItemReference>;

    /// A record for a detail page, or `None` when the page lacks the
    /// expected structure
    fn extract_record(&self, detail: &Document) -> Option<Record>;

    /// Last page number from a job's first listing page; 1 when the
    /// pagination control is missing or unparseable
    fn last_page_number(&self, listing: &Document) -> u32;
}

/// Extractor driven by CSS selectors from the `[selectors]` config block.
///
/// Defaults target MyBB thread listings and first posts.
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    item_link: Selector,
    pagination: Selector,
    pagination_last: Selector,
    pagination_page: Selector,
    first_post: Selector,
    title: Selector,
    author: Selector,
    posted_date: Selector,
    last_edited: Selector,
    content: Selector,
    author_rank: Selector,
    reputation: Selector,
    author_stat: Selector,
    span: Selector,
}

impl SelectorExtractor {
    pub fn new(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            item_link: validate_selector("item-link", &config.item_link)?,
            pagination: validate_selector("pagination", &config.pagination)?,
            pagination_last: validate_selector("pagination-last", &config.pagination_last)?,
            pagination_page: validate_selector("pagination-page", &config.pagination_page)?,
            first_post: validate_selector("first-post", &config.first_post)?,
            title: validate_selector("title", &config.title)?,
            author: validate_selector("author", &config.author)?,
            posted_date: validate_selector("posted-date", &config.posted_date)?,
            last_edited: validate_selector("last-edited", &config.last_edited)?,
            content: validate_selector("content", &config.content)?,
            author_rank: validate_selector("author-rank", &config.author_rank)?,
            reputation: validate_selector("reputation", &config.reputation)?,
            author_stat: validate_selector("author-stat", &config.author_stat)?,
            span: validate_selector("span", "span")?,
        })
    }
}

impl ItemExtractor for SelectorExtractor {
    fn extract_item_refs(&self, listing: &Document) -> Vec<ItemReference> {
        let Ok(base_url) = Url::parse(&listing.url) else {
            tracing::warn!("Listing URL '{}' is not absolute, no items extracted", listing.url);
            return Vec::new();
        };

        let html = Html::parse_document(&listing.body);
        html.select(&self.item_link)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| resolve_link(href, &base_url))
            .map(|url| ItemReference { url })
            .collect()
    }

    fn extract_record(&self, detail: &Document) -> Option<Record> {
        let html = Html::parse_document(&detail.body);

        let Some(post) = html.select(&self.first_post).next() else {
            tracing::warn!("No first post found on {}", detail.url);
            return None;
        };

        let posted_raw = post
            .select(&self.posted_date)
            .next()
            .map(|el| el.text().collect::<String>())
            .and_then(|text| {
                text.lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .map(collapse_whitespace)
            })
            .unwrap_or_default();

        let mut record = Record {
            id: detail.url.clone(),
            details_url: detail.url.clone(),
            title: first_text(html.select(&self.title)).unwrap_or_else(not_available),
            author: first_text(post.select(&self.author)).unwrap_or_else(not_available),
            posted_at_utc: normalize_posted_at(&posted_raw, Utc::now()),
            last_edited_info: first_text(post.select(&self.last_edited))
                .unwrap_or_else(not_available),
            main_content: first_text(post.select(&self.content)).unwrap_or_else(not_available),
            author_rank: first_text(post.select(&self.author_rank))
                .unwrap_or_else(not_available),
            reputation: first_text(post.select(&self.reputation))
                .unwrap_or_else(|| "0".to_string()),
            posts_count: not_available(),
            threads_count: not_available(),
            join_date: not_available(),
            ..Record::default()
        };

        for stat in post.select(&self.author_stat) {
            let spans: Vec<_> = stat.select(&self.span).collect();
            let [key, value] = spans.as_slice() else {
                continue;
            };
            let value = element_text(*value);
            match element_text(*key).as_str() {
                "Posts:" => record.posts_count = value,
                "Threads:" => record.threads_count = value,
                "Joined:" => record.join_date = value,
                _ => {}
            }
        }

        Some(record)
    }

    fn last_page_number(&self, listing: &Document) -> u32 {
        let html = Html::parse_document(&listing.body);

        let Some(pagination) = html.select(&self.pagination).next() else {
            tracing::info!("No pagination on {}, assuming a single page", listing.url);
            return 1;
        };

        if let Some(last) = pagination.select(&self.pagination_last).next() {
            if let Ok(page) = element_text(last).parse::<u32>() {
                return page.max(1);
            }
        }

        if let Some(last) = pagination.select(&self.pagination_page).last() {
            if let Ok(page) = element_text(last).parse::<u32>() {
                return page.max(1);
            }
        }

        tracing::warn!("Could not read pagination on {}, assuming a single page", listing.url);
        1
    }
}

fn not_available() -> String {
    "N/A".to_string()
}

/// Collapses runs of whitespace (including newlines) to single spaces
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Text of the first matched element, if any
fn first_text<'a>(mut elements: impl Iterator<Item = ElementRef<'a>>) -> Option<String> {
    elements.next().map(element_text)
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto: schemes
/// - Fragment-only anchors
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:") || href.starts_with("mailto:") {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> SelectorExtractor {
        SelectorExtractor::new(&SelectorConfig::default()).unwrap()
    }

    const LISTING: &str = r#"
<html><body>
  <table>
    <tr><td><span id="tid_101"><a href="Thread-Acme-Corp-Dump">Acme Corp dump</a></span></td></tr>
    <tr><td><span id="tid_102"><a href="/Thread-Globex-Leak?pid=3">Globex leak</a></span></td></tr>
    <tr><td><span class="sticky"><a href="Thread-Rules">Rules</a></span></td></tr>
    <tr><td><span id="tid_103"><a href="javascript:void(0)">broken</a></span></td></tr>
  </table>
  <div class="pagination">
    <a class="pagination_page" href="?page=2">2</a>
    <a class="pagination_page" href="?page=3">3</a>
    <a class="pagination_last" href="?page=57">57</a>
  </div>
</body></html>
"#;

    const DETAIL: &str = r#"
<html><body>
  <span class="thread-info__name">  Acme Corp
     full dump </span>
  <div id="posts">
    <div class="post classic">
      <div class="post_user-profile"><a href="/User-alice">alice</a></div>
      <div class="post_user-title">Elite Member</div>
      <div class="post_author-stats">
        <div class="post_stats-bit group"><span>Posts:</span><span>1,204</span></div>
        <div class="post_stats-bit group"><span>Threads:</span><span>88</span></div>
        <div class="post_stats-bit group"><span>Joined:</span><span>Jan 2023</span></div>
        <div class="post_stats-bit group"><span>Reputation only</span></div>
      </div>
      <strong class="reputation_positive">42</strong>
      <span class="post_date">16-05-25, 02:12 PM
        <span class="post_edit"><em>(This post was last modified: 17-05-25 by alice.)</em></span>
      </span>
      <div class="post_body">
        Sample of 10k rows.

        Download below.
      </div>
    </div>
    <div class="post classic">
      <div class="post_user-profile"><a href="/User-bob">bob</a></div>
      <div class="post_body">bump</div>
    </div>
  </div>
</body></html>
"#;

    #[test]
    fn test_extract_item_refs_resolves_against_listing() {
        let doc = Document::new("http://forum.example.onion/Forum-Databases?page=2", LISTING);
        let refs = extractor().extract_item_refs(&doc);
        let urls: Vec<_> = refs.iter().map(|r| r.url.as_str()).collect();

        assert_eq!(
            urls,
            vec![
                "http://forum.example.onion/Thread-Acme-Corp-Dump",
                "http://forum.example.onion/Thread-Globex-Leak?pid=3",
            ]
        );
    }

    #[test]
    fn test_last_page_prefers_last_link() {
        let doc = Document::new("http://forum.example.onion/Forum-Databases", LISTING);
        assert_eq!(extractor().last_page_number(&doc), 57);
    }

    #[test]
    fn test_last_page_falls_back_to_page_links() {
        let html = r#"<div class="pagination">
            <a class="pagination_page">2</a><a class="pagination_page">4</a>
        </div>"#;
        let doc = Document::new("http://forum.example.onion/Forum-Databases", html);
        assert_eq!(extractor().last_page_number(&doc), 4);
    }

    #[test]
    fn test_last_page_defaults_to_one() {
        let doc = Document::new("http://forum.example.onion/Forum-Databases", "<p>no pages</p>");
        assert_eq!(extractor().last_page_number(&doc), 1);

        let html = r#"<div class="pagination"><a class="pagination_last">Last</a></div>"#;
        let doc = Document::new("http://forum.example.onion/Forum-Databases", html);
        assert_eq!(extractor().last_page_number(&doc), 1);
    }

    #[test]
    fn test_extract_record_fields() {
        let url = "http://forum.example.onion/Thread-Acme-Corp-Dump";
        let record = extractor()
            .extract_record(&Document::new(url, DETAIL))
            .unwrap();

        assert_eq!(record.id, url);
        assert_eq!(record.details_url, url);
        assert_eq!(record.title, "Acme Corp full dump");
        assert_eq!(record.author, "alice");
        assert_eq!(record.author_rank, "Elite Member");
        assert_eq!(record.reputation, "42");
        assert_eq!(record.posts_count, "1,204");
        assert_eq!(record.threads_count, "88");
        assert_eq!(record.join_date, "Jan 2023");
        assert_eq!(record.posted_at_utc, "2025-05-16T14:12:00+00:00");
        assert_eq!(
            record.last_edited_info,
            "(This post was last modified: 17-05-25 by alice.)"
        );
        assert_eq!(record.main_content, "Sample of 10k rows. Download below.");
        assert!(record.source.is_empty());
    }

    #[test]
    fn test_extract_record_defaults() {
        let html = r#"<div id="posts"><div class="post classic"><div class="post_body">hi</div></div></div>"#;
        let record = extractor()
            .extract_record(&Document::new("http://forum.example.onion/Thread-x", html))
            .unwrap();

        assert_eq!(record.title, "N/A");
        assert_eq!(record.author, "N/A");
        assert_eq!(record.reputation, "0");
        assert_eq!(record.join_date, "N/A");
        assert_eq!(record.posted_at_utc, "");
        assert_eq!(record.main_content, "hi");
    }

    #[test]
    fn test_extract_record_without_post() {
        let doc = Document::new("http://forum.example.onion/Thread-x", "<h1>Access denied</h1>");
        assert!(extractor().extract_record(&doc).is_none());
    }

    #[test]
    fn test_resolve_link() {
        let base = Url::parse("http://forum.example.onion/Forum-Databases").unwrap();
        assert_eq!(
            resolve_link("Thread-a", &base),
            Some("http://forum.example.onion/Thread-a".to_string())
        );
        assert_eq!(resolve_link("#top", &base), None);
        assert_eq!(resolve_link("mailto:a@b.c", &base), None);
        assert_eq!(resolve_link("  ", &base), None);
    }
}
