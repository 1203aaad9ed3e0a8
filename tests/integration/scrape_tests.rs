//! Integration tests for the scraper
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! extract, probe and mirror cycle end-to-end.

use async_trait::async_trait;
use echo_sieve::config::Config;
use echo_sieve::download::mirror_file_name;
use echo_sieve::extract::{DisabledRenderer, PageRenderer};
use echo_sieve::scrape::OmitReason;
use echo_sieve::{LinkStatus, RetentionManager, ScrapeError, Scraper};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing mirrors into `dir`
fn create_test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.download_dir = dir.to_path_buf();
    config.timeouts.page_timeout_seconds = 2;
    config.timeouts.render_timeout_seconds = 2;
    config.timeouts.probe_timeout_seconds = 2;
    config.timeouts.download_timeout_seconds = 5;
    config.timeouts.scrape_deadline_seconds = 20;
    config
}

fn create_scraper(config: &Config, renderer: Arc<dyn PageRenderer>) -> Scraper {
    let retention = RetentionManager::from_config(config);
    Scraper::with_renderer(config, retention, renderer).expect("Failed to build scraper")
}

async fn mount_page(server: &MockServer, page_path: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Renderer returning fixed markup, standing in for a browser
struct StaticRenderer {
    html: String,
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    async fn render(&self, _url: &str) -> Result<String, ScrapeError> {
        Ok(self.html.clone())
    }
}

fn dir_entries(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_links_deduplicated_across_sources() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let escaped = format!("{}/x.mp3", base_url).replace('/', "\\/");

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><body>
            <a href="/x.mp3">Listen</a>
            <audio src="{base}/x.mp3"></audio>
            <audio><source src="x.mp3" type="audio/mpeg"></audio>
            <script>var player = {{"file": "{escaped}"}};</script>
            </body></html>"#,
            base = base_url,
            escaped = escaped
        ),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());
    let scraper = create_scraper(&config, Arc::new(DisabledRenderer));

    let links = scraper
        .extractor()
        .extract_links(&format!("{}/", base_url))
        .await;

    assert_eq!(links.len(), 1);
    assert!(links.contains(&format!("{}/x.mp3", base_url)));
}

#[tokio::test]
async fn test_end_to_end_direct_and_temporary() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body>
        <a href="/a.mp3">A</a>
        <audio><source src="/b.mp3?x=1" type="audio/mpeg"></audio>
        <a href="/notes.txt">Notes</a>
        </body></html>"#
            .to_string(),
    )
    .await;

    // a.mp3 answers HEAD directly
    Mock::given(method("HEAD"))
        .and(path("/a.mp3"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // b.mp3 rejects HEAD and ranged GET but serves a full GET
    Mock::given(method("HEAD"))
        .and(path("/b.mp3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b.mp3"))
        .and(header_exists("range"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![42u8; 4096]))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());
    let scraper = create_scraper(&config, Arc::new(DisabledRenderer));

    let result = scraper.scrape(&format!("{}/", base_url)).await;

    let a_url = format!("{}/a.mp3", base_url);
    let b_file = mirror_file_name(&Url::parse(&format!("{}/b.mp3?x=1", base_url)).unwrap());

    assert_eq!(result.len(), 2);
    assert_eq!(result.get(&a_url), Some(LinkStatus::Direct));
    assert_eq!(result.get(&b_file), Some(LinkStatus::Temporary));
    assert!(result.omitted().is_empty());

    assert!(b_file.starts_with("b-"));
    assert_eq!(
        std::fs::read(dir.path().join(&b_file)).unwrap(),
        vec![42u8; 4096]
    );
    assert!(scraper.downloader().dir().join(&b_file).exists());

    let entries = result.to_entries(Some("http://localhost:5000"));
    assert!(entries
        .iter()
        .any(|e| e.locator == format!("http://localhost:5000/downloads/{}", b_file)
            && e.kind == LinkStatus::Temporary));
    assert!(entries
        .iter()
        .any(|e| e.locator == a_url && e.kind == LinkStatus::Direct));
}

#[tokio::test]
async fn test_frame_links_merged() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body>
        <a href="/outer.mp3">Outer</a>
        <iframe src="/frame"></iframe>
        </body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/frame",
        r#"<html><body><a href="/c.mp3">C</a></body></html>"#.to_string(),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());
    let scraper = create_scraper(&config, Arc::new(DisabledRenderer));

    let links = scraper
        .extractor()
        .extract_links(&format!("{}/", base_url))
        .await;

    assert_eq!(links.len(), 2);
    assert!(links.contains(&format!("{}/outer.mp3", base_url)));
    assert!(links.contains(&format!("{}/c.mp3", base_url)));
}

#[tokio::test]
async fn test_frame_cycle_terminates() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    // Each document embeds the other; each must be loaded exactly once
    Mock::given(method("GET"))
        .and(path("/one"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><a href="/one.mp3">1</a><iframe src="/two"></iframe></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/two"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><a href="/two.mp3">2</a><iframe src="/one"></iframe></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.limits.max_frame_depth = 10;
    let scraper = create_scraper(&config, Arc::new(DisabledRenderer));

    let links = scraper
        .extractor()
        .extract_links(&format!("{}/one", base_url))
        .await;

    assert_eq!(links.len(), 2);
    assert!(links.contains(&format!("{}/one.mp3", base_url)));
    assert!(links.contains(&format!("{}/two.mp3", base_url)));
}

#[tokio::test]
async fn test_frame_depth_limit() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/d0",
        r#"<html><body><iframe src="/d1"></iframe></body></html>"#.to_string(),
    )
    .await;
    mount_page(
        &server,
        "/d1",
        r#"<html><body><a href="/d1.mp3">1</a><iframe src="/d2"></iframe></body></html>"#
            .to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/d2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><a href="/d2.mp3">2</a></body></html>"#),
        )
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.limits.max_frame_depth = 1;
    let scraper = create_scraper(&config, Arc::new(DisabledRenderer));

    let links = scraper
        .extractor()
        .extract_links(&format!("{}/d0", base_url))
        .await;

    assert_eq!(links.len(), 1);
    assert!(links.contains(&format!("{}/d1.mp3", base_url)));
}

#[tokio::test]
async fn test_render_fallback_used_when_fetch_fails() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/spa"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let renderer = StaticRenderer {
        html: format!(
            r#"<html><body><a href="{}/rendered.mp3">Injected</a></body></html>"#,
            base_url
        ),
    };

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());
    let scraper = create_scraper(&config, Arc::new(renderer));

    let links = scraper
        .extractor()
        .extract_links(&format!("{}/spa", base_url))
        .await;

    assert_eq!(links.len(), 1);
    assert!(links.contains(&format!("{}/rendered.mp3", base_url)));
}

#[tokio::test]
async fn test_unreachable_page_yields_empty_result() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());
    let scraper = create_scraper(&config, Arc::new(DisabledRenderer));

    // Nothing listens on port 1
    let result = scraper.scrape("http://127.0.0.1:1/").await;

    assert!(result.is_empty());
    assert!(result.omitted().is_empty());
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_oversized_link_omitted() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/huge.mp3">Huge</a></body></html>"#.to_string(),
    )
    .await;
    Mock::given(method("HEAD"))
        .and(path("/huge.mp3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/huge.mp3"))
        .and(header_exists("range"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/huge.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2 * 1024 * 1024]))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.limits.max_file_size_mb = 1;
    let scraper = create_scraper(&config, Arc::new(DisabledRenderer));

    let result = scraper.scrape(&format!("{}/", base_url)).await;

    assert!(result.is_empty());
    assert_eq!(result.omitted().len(), 1);
    assert_eq!(result.omitted()[0].url, format!("{}/huge.mp3", base_url));
    assert_eq!(result.omitted()[0].reason, OmitReason::TooLarge);
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_cancelled_scrape_yields_empty_result() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><a href="/a.mp3">A</a></body></html>"#),
        )
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());
    let scraper = create_scraper(&config, Arc::new(DisabledRenderer));

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = scraper
        .scrape_with_cancel(&format!("{}/", base_url), &cancel)
        .await;

    assert!(result.is_empty());
}

#[tokio::test]
async fn test_failed_probe_cached_across_scrapes() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/dead.mp3">Dead</a></body></html>"#.to_string(),
    )
    .await;
    Mock::given(method("HEAD"))
        .and(path("/dead.mp3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    // Only the first scrape gets as far as the ranged probe
    Mock::given(method("GET"))
        .and(path("/dead.mp3"))
        .and(header_exists("range"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dead.mp3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());
    let scraper = create_scraper(&config, Arc::new(DisabledRenderer));
    let page = format!("{}/", base_url);

    let first = scraper.scrape(&page).await;
    let second = scraper.scrape(&page).await;

    for result in [&first, &second] {
        assert!(result.is_empty());
        assert_eq!(result.omitted().len(), 1);
        assert_eq!(result.omitted()[0].reason, OmitReason::DownloadFailed);
    }
    assert!(scraper
        .prober()
        .cache()
        .contains(&format!("{}/dead.mp3", base_url)));
}

#[tokio::test]
async fn test_deadline_abandons_outstanding_probe() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/stalled.mp3">Stalled</a></body></html>"#.to_string(),
    )
    .await;
    Mock::given(method("HEAD"))
        .and(path("/stalled.mp3"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.timeouts.probe_timeout_seconds = 10;
    config.timeouts.scrape_deadline_seconds = 1;
    let scraper = create_scraper(&config, Arc::new(DisabledRenderer));

    let result = scraper.scrape(&format!("{}/", base_url)).await;

    assert!(result.is_empty());
    assert_eq!(result.omitted().len(), 1);
    assert_eq!(result.omitted()[0].url, format!("{}/stalled.mp3", base_url));
    assert_eq!(result.omitted()[0].reason, OmitReason::Cancelled);
}

#[tokio::test]
async fn test_cancel_during_download_omits_link() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/slow.mp3">Slow</a></body></html>"#.to_string(),
    )
    .await;
    Mock::given(method("HEAD"))
        .and(path("/slow.mp3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow.mp3"))
        .and(header_exists("range"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow.mp3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![9u8; 4096])
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.timeouts.download_timeout_seconds = 10;
    let scraper = create_scraper(&config, Arc::new(DisabledRenderer));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let result = scraper
        .scrape_with_cancel(&format!("{}/", base_url), &cancel)
        .await;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(result.is_empty());
    assert_eq!(result.omitted().len(), 1);
    assert_eq!(result.omitted()[0].url, format!("{}/slow.mp3", base_url));
    assert_eq!(result.omitted()[0].reason, OmitReason::Cancelled);
    assert!(dir_entries(dir.path())
        .iter()
        .all(|name| !name.ends_with(".part")));
    assert_eq!(scraper.downloader().dir(), dir.path());
}
