//! Scripted collaborators shared by the crawler unit tests

use crate::crawler::fetcher::{Document, FetchError, Fetcher};
use crate::crawler::probe::ReachabilityProbe;
use crate::record::Record;
use crate::storage::{RecordSink, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
enum Reply {
    Page(String),
    Fail(FetchError),
    Trip(CancellationToken),
}

/// Fetcher answering from a fixed URL -> reply table.
///
/// Unscripted URLs answer HTTP 404.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.replies.insert(url.to_string(), Reply::Page(body.into()));
        self
    }

    pub(crate) fn fail(mut self, url: &str, error: FetchError) -> Self {
        self.replies.insert(url.to_string(), Reply::Fail(error));
        self
    }

    /// Cancels `token` when `url` is requested and never answers
    pub(crate) fn trip(mut self, url: &str, token: CancellationToken) -> Self {
        self.replies.insert(url.to_string(), Reply::Trip(token));
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn was_fetched(&self, url: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == url)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        match self.replies.get(url).cloned() {
            Some(Reply::Page(body)) => Ok(Document::new(url, body)),
            Some(Reply::Fail(error)) => Err(error),
            Some(Reply::Trip(token)) => {
                token.cancel();
                std::future::pending().await
            }
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

pub(crate) fn transport_error(url: &str) -> FetchError {
    FetchError::Transport {
        url: url.to_string(),
        reason: "connection reset by peer".to_string(),
    }
}

/// Listing page in the default MyBB layout. `paths` are relative thread links.
pub(crate) fn listing_html(paths: &[&str], last_page: u32) -> String {
    let rows: String = paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            format!(
                "<tr><td><span id=\"tid_{}\"><a href=\"/{}\">{}</a></span></td></tr>\n",
                i + 1,
                path,
                path
            )
        })
        .collect();

    let pagination = if last_page > 1 {
        format!(
            "<div class=\"pagination\"><a class=\"pagination_last\">{}</a></div>",
            last_page
        )
    } else {
        String::new()
    };

    format!("<html><body><table>{}</table>{}</body></html>", rows, pagination)
}

/// Detail page with a single first post
pub(crate) fn detail_html(title: &str) -> String {
    format!(
        r#"<html><body>
<span class="thread-info__name">{}</span>
<div id="posts"><div class="post classic">
  <div class="post_user-profile"><a href="/User-seller">seller</a></div>
  <span class="post_date">16-05-25, 02:12 PM</span>
  <div class="post_body">Selling {}</div>
</div></div>
</body></html>"#,
        title, title
    )
}

/// In-memory sink whose contents survive being boxed into a crawl context
#[derive(Clone, Default)]
pub(crate) struct MemorySink {
    records: Arc<Mutex<Vec<Record>>>,
    fail_appends: Arc<AtomicBool>,
}

impl MemorySink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.id).collect()
    }

    pub(crate) fn fail_appends(&self) {
        self.fail_appends.store(true, Ordering::SeqCst);
    }

    pub(crate) fn seed(&self, ids: &[&str]) {
        let mut records = self.records.lock().unwrap();
        for id in ids {
            records.push(Record {
                id: id.to_string(),
                details_url: id.to_string(),
                ..Record::default()
            });
        }
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, records: &[Record]) -> StorageResult<usize> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.records.lock().unwrap().extend_from_slice(records);
        Ok(records.len())
    }

    fn load_ids(&self) -> StorageResult<HashSet<String>> {
        Ok(self.ids().into_iter().collect())
    }
}

/// Probe with a fixed answer
pub(crate) struct FixedProbe(pub bool);

#[async_trait]
impl ReachabilityProbe for FixedProbe {
    async fn check(&self) -> bool {
        self.0
    }
}
