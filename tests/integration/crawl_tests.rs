//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock forum servers and test
//! the full crawl cycle end-to-end, including halting and resuming.

use forum_sweep::config::{parse_config, Config, CrawlerConfig};
use forum_sweep::crawler::{Coordinator, FetchError, Fetcher, HttpFetcher, RunStatus};
use forum_sweep::state::CheckpointStore;
use forum_sweep::storage::SqliteStorage;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, dir: &TempDir, extra: &str) -> Config {
    let toml = format!(
        r#"
[site]
base-url = "{base}/"
source = "forum.test"
section-prefix = "Forum-"

[crawler]
request-timeout-secs = 1
connect-timeout-secs = 1
transport-retries = 0

[output]
database-path = "{db}"
checkpoint-path = "{checkpoint}"
summary-path = "{summary}"

{extra}

[[section]]
name = "Databases"
identifier = "Forum-Databases"

[[section]]
name = "Combolists"
identifier = "Forum-Combolists"
"#,
        base = server.uri(),
        db = dir.path().join("records.db").display(),
        checkpoint = dir.path().join("crawl_state.json").display(),
        summary = dir.path().join("report.md").display(),
        extra = extra,
    );
    parse_config(&toml).expect("test config is valid")
}

fn listing_body(threads: &[String], last_page: u32) -> String {
    let rows: String = threads
        .iter()
        .enumerate()
        .map(|(i, t)| {
            format!(
                r#"<tr><td><span id="tid_{}"><a href="/{}">{}</a></span></td></tr>"#,
                i, t, t
            )
        })
        .collect();
    format!(
        r#"<html><body><table>{}</table>
        <div class="pagination"><a class="pagination_last">{}</a></div></body></html>"#,
        rows, last_page
    )
}

fn detail_body(title: &str) -> String {
    format!(
        r#"<html><body>
        <span class="thread-info__name">{}</span>
        <div id="posts"><div class="post classic">
          <div class="post_user-profile"><a href="/User-1">seller</a></div>
          <span class="post_date">16-05-25, 02:12 PM</span>
          <div class="post_body">{} sample</div>
        </div></div></body></html>"#,
        title, title
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

fn threads(section: &str, page: u32) -> Vec<String> {
    (1..=2).map(|i| format!("Thread-{}-{}-{}", section, page, i)).collect()
}

/// Mounts a section with `pages` listing pages of two threads each.
///
/// Pages listed in `stalled` answer slower than the client timeout.
async fn mount_section(server: &MockServer, section: &str, pages: u32, stalled: &[u32]) {
    let section_path = format!("/Forum-{}", section);

    // page-specific mocks first so they win over the bare section path
    for page in (2..=pages).rev() {
        let mut response = html(listing_body(&threads(section, page), pages));
        if stalled.contains(&page) {
            response = response.set_delay(Duration::from_secs(3));
        }
        Mock::given(method("GET"))
            .and(path(section_path.as_str()))
            .and(query_param("page", page.to_string().as_str()))
            .respond_with(response)
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path(section_path.as_str()))
        .respond_with(html(listing_body(&threads(section, 1), pages)))
        .mount(server)
        .await;

    for page in 1..=pages {
        for thread in threads(section, page) {
            Mock::given(method("GET"))
                .and(path(format!("/{}", thread).as_str()))
                .respond_with(html(detail_body(&thread)))
                .mount(server)
                .await;
        }
    }
}

fn stored_ids(dir: &TempDir) -> Vec<String> {
    let storage = SqliteStorage::new(&dir.path().join("records.db")).unwrap();
    storage
        .load_records()
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect()
}

#[tokio::test]
async fn test_full_crawl_then_rerun_adds_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_section(&server, "Databases", 2, &[]).await;
    mount_section(&server, "Combolists", 1, &[]).await;

    let config = create_test_config(&server, &dir, "");
    let report = Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.totals.records_saved, 6);
    assert_eq!(stored_ids(&dir).len(), 6);
    assert!(!dir.path().join("crawl_state.json").exists());
    assert!(dir.path().join("report.md").exists());

    let storage = SqliteStorage::new(&dir.path().join("records.db")).unwrap();
    let records = storage.load_records().unwrap();
    let first = &records[0];
    assert_eq!(first.source, "forum.test");
    assert_eq!(first.record_type, "leak_post");
    assert_eq!(first.forum, "databases");
    assert_eq!(first.id, format!("{}/Thread-Databases-1-1", server.uri()));
    assert_eq!(first.title, "Thread-Databases-1-1");
    assert_eq!(first.posted_at_utc, "2025-05-16T14:12:00+00:00");
    assert!(first.crawled_at_kst.ends_with("+09:00"));
    assert!(first.company.is_empty());

    // Every thread is known now: each section stops after its first page
    let report = Coordinator::new(config, false)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.totals.records_saved, 0);
    assert_eq!(stored_ids(&dir).len(), 6);
}

#[tokio::test]
async fn test_stalled_page_halts_and_resume_completes() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_section(&server, "Databases", 3, &[2]).await;
    mount_section(&server, "Combolists", 1, &[]).await;

    let config = create_test_config(&server, &dir, "");
    let report = Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await
        .unwrap();

    match &report.status {
        RunStatus::Halted { job_id, page, .. } => {
            assert_eq!(job_id, "Forum-Databases");
            assert_eq!(*page, 2);
        }
        other => panic!("expected a halt, got {:?}", other),
    }
    assert_eq!(stored_ids(&dir).len(), 2);

    let checkpoint = CheckpointStore::new(dir.path().join("crawl_state.json"));
    assert_eq!(checkpoint.load(), (Some("Forum-Databases".to_string()), 2));

    // The network recovers
    server.reset().await;
    mount_section(&server, "Databases", 3, &[]).await;
    mount_section(&server, "Combolists", 1, &[]).await;

    let report = Coordinator::new(config, false)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.totals.records_saved, 6);

    let mut ids = stored_ids(&dir);
    assert_eq!(ids.len(), 8);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}

#[tokio::test]
async fn test_failed_reachability_check_crawls_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_section(&server, "Databases", 1, &[]).await;
    Mock::given(method("GET"))
        .and(path("/api/ip"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"IsTor": false})),
        )
        .mount(&server)
        .await;

    let extra = format!(
        "[reachability]\nurl = \"{}/api/ip\"\nrequire-tor = true\n",
        server.uri()
    );
    let config = create_test_config(&server, &dir, &extra);
    let report = Coordinator::new(config, false)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Unreachable);
    assert!(report.jobs.is_empty());
    assert!(stored_ids(&dir).is_empty());
}

#[tokio::test]
async fn test_challenge_page_is_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/Forum-Databases"))
        .respond_with(html(listing_body(
            &["Thread-ok".to_string(), "Thread-blocked".to_string()],
            1,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Thread-ok"))
        .respond_with(html(detail_body("ok")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Thread-blocked"))
        .respond_with(html("<h1>Verify you are human</h1>".to_string()))
        .mount(&server)
        .await;

    let config = create_test_config(
        &server,
        &dir,
        "[challenge]\nmarkers = [\"verify you are human\"]\n",
    );
    let report = Coordinator::new(config, false)
        .unwrap()
        .run()
        .await
        .unwrap();

    // Combolists is not mounted and is skipped with a 404
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.totals.records_saved, 1);
    assert_eq!(report.totals.soft_errors, 1);
    assert_eq!(report.totals.transport_errors, 1);
    assert_eq!(stored_ids(&dir), vec![format!("{}/Thread-ok", server.uri())]);
}

fn fetcher() -> HttpFetcher {
    let config = CrawlerConfig {
        request_timeout_secs: 1,
        connect_timeout_secs: 1,
        transport_retries: 0,
        ..CrawlerConfig::default()
    };
    HttpFetcher::new(&config).unwrap()
}

#[tokio::test]
async fn test_fetcher_returns_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Forum-Databases"))
        .respond_with(html("<p>hello</p>".to_string()))
        .mount(&server)
        .await;

    let url = format!("{}/Forum-Databases", server.uri());
    let document = fetcher().fetch(&url).await.unwrap();

    assert_eq!(document.url, url);
    assert_eq!(document.body, "<p>hello</p>");
}

#[tokio::test]
async fn test_fetcher_error_status_is_recoverable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = fetcher()
        .fetch(&format!("{}/Thread-1", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 503, .. }));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_fetcher_timeout_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("late".to_string()).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let err = fetcher()
        .fetch(&format!("{}/Thread-1", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Transport { .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_fetcher_connection_refused_is_fatal() {
    // Bind then drop a listener so the port is closed
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = fetcher()
        .fetch(&format!("http://{}/", addr))
        .await
        .unwrap_err();

    assert!(err.is_fatal());
}

#[test]
fn test_storage_path_is_created() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a").join("b").join("records.db");
    SqliteStorage::new(Path::new(&nested)).unwrap();
    assert!(nested.exists());
}
