//! Integration tests for the crawl stage
//!
//! The scripted browser drives the coordinator without a network; the
//! wiremock tests exercise the reqwest-backed browser end-to-end.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use story_pipeline::config::Config;
use story_pipeline::crawler::{
    run_crawl, Browser, CrawlOptions, FetchSession, HttpBrowser, SessionSettings,
};
use story_pipeline::{FetchError, FetchResult, PipelineError};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a configuration whose every path lives under `dir`
fn create_test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    let root = dir.path();
    config.paths.targets = root.join("urls.txt").display().to_string();
    config.paths.ledger = root.join("history.log").display().to_string();
    config.paths.error_log = root.join("errors.log").display().to_string();
    config.paths.raw_dir = root.join("raw").display().to_string();
    config.paths.database = root.join("store.db").display().to_string();
    config.paths.out_dir = root.join("out").display().to_string();
    config.crawler.request_delay_ms = 0;
    config.crawler.challenge_wait_secs = 0;
    config.crawler.navigation_timeout_secs = 5;
    config
}

fn write_targets(config: &Config, urls: &[&str]) {
    std::fs::write(&config.paths.targets, urls.join("\n")).unwrap();
}

fn options(config: &Config, workers: usize) -> CrawlOptions {
    let mut options = CrawlOptions::from_config(config);
    options.worker_count = workers;
    options
}

fn read_lines(path: &str) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Browser that serves canned pages and records every navigation
#[derive(Default)]
struct ScriptedBrowser {
    failing: HashSet<String>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl ScriptedBrowser {
    fn failing(urls: &[&str]) -> Self {
        Self {
            failing: urls.iter().map(|u| u.to_string()).collect(),
            ..Default::default()
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }
}

struct ScriptedSession {
    failing: HashSet<String>,
    fetched: Arc<Mutex<Vec<String>>>,
    current: Option<String>,
}

#[async_trait]
impl Browser for ScriptedBrowser {
    async fn open_session(&self, _: &SessionSettings) -> FetchResult<Box<dyn FetchSession>> {
        Ok(Box::new(ScriptedSession {
            failing: self.failing.clone(),
            fetched: Arc::clone(&self.fetched),
            current: None,
        }))
    }
}

#[async_trait]
impl FetchSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> FetchResult<()> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(FetchError::TransientNetwork("connection reset".to_string()));
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn title(&mut self) -> FetchResult<Option<String>> {
        Ok(Some("A Story".to_string()))
    }

    async fn content(&mut self) -> FetchResult<String> {
        Ok(format!(
            "<html><body>{}</body></html>",
            self.current.clone().unwrap_or_default()
        ))
    }

    async fn close(self: Box<Self>) {}
}

#[tokio::test]
async fn test_second_run_fetches_nothing() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    write_targets(
        &config,
        &[
            "https://site.test/comedy/one/",
            "https://site.test/comedy/two/",
            "",
            "https://site.test/drama/three",
        ],
    );

    let browser = Arc::new(ScriptedBrowser::default());
    let first = run_crawl(&config, options(&config, 2), browser.clone())
        .await
        .unwrap();

    assert_eq!(first.total, 3);
    assert_eq!(first.succeeded, 3);
    assert_eq!(first.failed, 0);
    assert_eq!(browser.fetch_count(), 3);
    assert_eq!(read_lines(&config.paths.ledger).len(), 3);
    for name in ["one.html", "two.html", "three.html"] {
        assert!(dir.path().join("raw").join(name).exists(), "{name} missing");
    }

    let second = run_crawl(&config, options(&config, 2), browser.clone())
        .await
        .unwrap();

    assert_eq!(second.already_done, 3);
    assert_eq!(second.pending, 0);
    assert_eq!(browser.fetch_count(), 3);
}

#[tokio::test]
async fn test_failure_is_logged_and_retried_next_run() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let bad = "https://site.test/comedy/bad/";
    write_targets(
        &config,
        &["https://site.test/comedy/good/", bad, "https://site.test/comedy/fine/"],
    );

    let browser = Arc::new(ScriptedBrowser::failing(&[bad]));
    let report = run_crawl(&config, options(&config, 1), browser.clone())
        .await
        .unwrap();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);

    let errors = read_lines(&config.paths.error_log);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with(&format!("{bad} | ")));
    assert!(!read_lines(&config.paths.ledger).contains(&bad.to_string()));

    let retry = run_crawl(&config, options(&config, 1), browser.clone())
        .await
        .unwrap();
    assert_eq!(retry.pending, 1);
    assert_eq!(retry.failed, 1);
}

#[tokio::test]
async fn test_existing_raw_document_is_skipped_without_ledger_entry() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    write_targets(&config, &["https://site.test/comedy/manual/"]);
    std::fs::create_dir_all(&config.paths.raw_dir).unwrap();
    std::fs::write(dir.path().join("raw").join("manual.html"), "<html></html>").unwrap();

    let browser = Arc::new(ScriptedBrowser::default());
    let report = run_crawl(&config, options(&config, 1), browser.clone())
        .await
        .unwrap();

    assert_eq!(report.already_done, 1);
    assert_eq!(browser.fetch_count(), 0);
}

#[tokio::test]
async fn test_force_refetches_everything() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    write_targets(&config, &["https://site.test/a/x/", "https://site.test/a/y/"]);

    let browser = Arc::new(ScriptedBrowser::default());
    run_crawl(&config, options(&config, 2), browser.clone())
        .await
        .unwrap();

    let mut forced = options(&config, 2);
    forced.force = true;
    let report = run_crawl(&config, forced, browser.clone()).await.unwrap();

    assert_eq!(report.already_done, 0);
    assert_eq!(report.succeeded, 2);
    assert_eq!(browser.fetch_count(), 4);
}

#[tokio::test]
async fn test_dry_run_fetches_nothing() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    write_targets(&config, &["https://site.test/a/x/"]);

    let mut dry = options(&config, 1);
    dry.dry_run = true;
    let browser = Arc::new(ScriptedBrowser::default());
    let report = run_crawl(&config, dry, browser.clone()).await.unwrap();

    assert_eq!(report.pending, 1);
    assert_eq!(report.succeeded, 0);
    assert_eq!(browser.fetch_count(), 0);
}

#[tokio::test]
async fn test_missing_target_list_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    let browser = Arc::new(ScriptedBrowser::default());
    let result = run_crawl(&config, options(&config, 1), browser.clone()).await;

    assert!(matches!(result, Err(PipelineError::Config(_))));
    assert_eq!(browser.fetch_count(), 0);
}

#[tokio::test]
async fn test_invalid_worker_count_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    write_targets(&config, &["https://site.test/a/x/"]);

    let browser = Arc::new(ScriptedBrowser::default());
    let result = run_crawl(&config, options(&config, 0), browser.clone()).await;

    assert!(matches!(result, Err(PipelineError::Config(_))));
    assert_eq!(browser.fetch_count(), 0);
}

#[tokio::test]
async fn test_http_browser_against_mock_server() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/comedy/my-story/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>My Story</title></head><body>story</body></html>",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/comedy/blocked/"))
        .respond_with(ResponseTemplate::new(503).set_body_string(
            "<html><head><title>Just a moment...</title></head><body></body></html>",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/comedy/missing/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let ok_url = format!("{base_url}/comedy/my-story/");
    let blocked_url = format!("{base_url}/comedy/blocked/");
    let missing_url = format!("{base_url}/comedy/missing/");
    write_targets(&config, &[&ok_url, &blocked_url, &missing_url]);

    let browser = Arc::new(HttpBrowser::new(&config.crawler).unwrap());
    let report = run_crawl(&config, options(&config, 3), browser)
        .await
        .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 2);

    let saved = std::fs::read_to_string(dir.path().join("raw").join("my-story.html")).unwrap();
    assert!(saved.contains("<title>My Story</title>"));
    assert!(!dir.path().join("raw").join("blocked.html").exists());
    assert_eq!(read_lines(&config.paths.ledger), vec![ok_url]);

    let errors = read_lines(&config.paths.error_log);
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|l| l.starts_with(&blocked_url) && l.contains("challenge")));
    assert!(errors.iter().any(|l| l.starts_with(&missing_url) && l.contains("404")));
}

#[tokio::test]
async fn test_colliding_filenames_fetch_once() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let second = "https://site.test/drama/story/";
    write_targets(&config, &["https://site.test/comedy/story/", second]);

    let browser = Arc::new(ScriptedBrowser::default());
    let report = run_crawl(&config, options(&config, 2), browser.clone())
        .await
        .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(browser.fetch_count(), 1);

    let saved = std::fs::read_to_string(dir.path().join("raw").join("story.html")).unwrap();
    assert!(saved.contains("https://site.test/comedy/story/"));

    let errors = read_lines(&config.paths.error_log);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with(&format!("{second} | ")));
    assert!(errors[0].contains("already claimed"));
}

#[tokio::test]
async fn test_error_page_without_challenge_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/comedy/down/"))
        .respond_with(ResponseTemplate::new(503).set_body_string(
            "<html><head><title>503 Service Unavailable</title></head><body>maintenance</body></html>",
        ))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let url = format!("{}/comedy/down/", mock_server.uri());
    write_targets(&config, &[&url]);

    let browser = Arc::new(HttpBrowser::new(&config.crawler).unwrap());
    let report = run_crawl(&config, options(&config, 1), browser.clone())
        .await
        .unwrap();

    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failed, 1);
    assert!(!dir.path().join("raw").join("down.html").exists());
    assert!(read_lines(&config.paths.ledger).is_empty());
    assert!(read_lines(&config.paths.error_log)[0].contains("503"));

    let retry = run_crawl(&config, options(&config, 1), browser).await.unwrap();
    assert_eq!(retry.already_done, 0);
    assert_eq!(retry.pending, 1);
}

#[tokio::test]
async fn test_slow_challenge_recheck_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/comedy/slow/"))
        .respond_with(ResponseTemplate::new(503).set_body_string(
            "<html><head><title>Just a moment...</title></head><body></body></html>",
        ))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/comedy/slow/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><head><title>Slow</title></head></html>")
                .set_delay(std::time::Duration::from_secs(30)),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.crawler.navigation_timeout_secs = 1;
    let url = format!("{}/comedy/slow/", mock_server.uri());
    write_targets(&config, &[&url]);

    let started = std::time::Instant::now();
    let browser = Arc::new(HttpBrowser::new(&config.crawler).unwrap());
    let report = run_crawl(&config, options(&config, 1), browser).await.unwrap();

    assert_eq!(report.failed, 1);
    assert!(started.elapsed() < std::time::Duration::from_secs(8));
    assert!(!dir.path().join("raw").join("slow.html").exists());
}

#[tokio::test]
async fn test_blocked_resource_type_is_refused() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/media/cover/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![0x89, b'P', b'N', b'G']),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let url = format!("{}/media/cover/", mock_server.uri());
    write_targets(&config, &[&url]);

    let browser = Arc::new(HttpBrowser::new(&config.crawler).unwrap());
    let report = run_crawl(&config, options(&config, 1), browser).await.unwrap();

    assert_eq!(report.failed, 1);
    assert!(read_lines(&config.paths.error_log)[0].contains("blocked resource type 'image'"));
}
