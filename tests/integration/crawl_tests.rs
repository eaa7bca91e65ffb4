//! Integration tests for the crawler
//!
//! Most tests run the engine against an in-memory site so fetch counts and
//! timings are under the test's control. The last tests use wiremock to run
//! the full crawl cycle over HTTP.

use async_trait::async_trait;
use docs_to_markdown::config::{Config, CrawlerConfig, OutputConfig, OutputMode};
use docs_to_markdown::crawler::{
    crawl, CrawlEngine, CrawlReport, FetchFailure, FetchResult, FixedGauge, PageError,
    PageFetcher,
};
use docs_to_markdown::filter::{Classifier, ClassifyError, ContentFilter, ModelFilter};
use docs_to_markdown::output::{
    Html2MdConverter, MarkdownConverter, PageSink, SINGLE_FILE, SUMMARY_FILE,
};
use docs_to_markdown::{DocsError, TaskState};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a documentation page with a nav bar of `links`
fn doc_page(title: &str, links: &[&str]) -> String {
    let nav: String = links
        .iter()
        .map(|href| format!(r#"<li><a href="{}">{}</a></li>"#, href, href))
        .collect();
    format!(
        r#"<html><head><title>{title}</title></head><body>
        <nav><ul>{nav}</ul></nav>
        <main>
          <h1>{title}</h1>
          <p>This page of the {title} guide explains how the feature works and how to configure it.</p>
        </main>
        <footer>Copyright</footer>
        </body></html>"#
    )
}

/// In-memory site that records every fetch
#[derive(Default)]
struct SiteFetcher {
    pages: HashMap<String, FetchResult>,
    delays: HashMap<String, Duration>,
    fetches: Mutex<Vec<String>>,
}

impl SiteFetcher {
    fn html(mut self, url: &str, body: String) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchResult::Success {
                final_url: Url::parse(url).unwrap(),
                status_code: 200,
                content_type: "text/html; charset=utf-8".to_string(),
                body,
            },
        );
        self
    }

    fn redirect(mut self, url: &str, target: &str, body: String) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchResult::Success {
                final_url: Url::parse(target).unwrap(),
                status_code: 200,
                content_type: "text/html".to_string(),
                body,
            },
        );
        self
    }

    fn result(mut self, url: &str, result: FetchResult) -> Self {
        self.pages.insert(url.to_string(), result);
        self
    }

    fn delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    fn fetch_count(&self, url: &str) -> usize {
        self.fetched().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl PageFetcher for SiteFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult {
        self.fetches.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delays.get(url.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        self.pages
            .get(url.as_str())
            .cloned()
            .unwrap_or(FetchResult::HttpError { status_code: 404 })
    }
}

fn crawler_config(max_depth: u32, ceiling: u32) -> CrawlerConfig {
    CrawlerConfig {
        max_depth,
        concurrency_ceiling: ceiling,
        ..Default::default()
    }
}

/// Classifier whose backend is always down
struct UnavailableClassifier;

#[async_trait]
impl Classifier for UnavailableClassifier {
    async fn classify(&self, _block: &str) -> Result<bool, ClassifyError> {
        Err(ClassifyError::Http("503 Service Unavailable".to_string()))
    }
}

/// Converter that panics on pages titled "Exploding"
struct PanickingConverter;

impl MarkdownConverter for PanickingConverter {
    fn convert(&self, html: &str) -> String {
        if html.contains("Exploding") {
            panic!("converter blew up");
        }
        Html2MdConverter.convert(html)
    }
}

fn build_engine_with(
    seed: &str,
    site: Arc<SiteFetcher>,
    config: &CrawlerConfig,
    root: &Path,
    filter: ContentFilter,
    converter: Arc<dyn MarkdownConverter>,
) -> CrawlEngine {
    CrawlEngine::new(
        config,
        &Url::parse(seed).unwrap(),
        site,
        filter,
        converter,
        Arc::new(PageSink::new(OutputMode::Tree, root)),
        Arc::new(FixedGauge::new(0.0)),
    )
    .unwrap()
}

fn build_engine(
    seed: &str,
    site: Arc<SiteFetcher>,
    config: &CrawlerConfig,
    root: &Path,
    mode: OutputMode,
) -> CrawlEngine {
    CrawlEngine::new(
        config,
        &Url::parse(seed).unwrap(),
        site,
        ContentFilter::Heuristic(Default::default()),
        Arc::new(Html2MdConverter),
        Arc::new(PageSink::new(mode, root)),
        Arc::new(FixedGauge::new(0.0)),
    )
    .unwrap()
}

async fn run_tree(seed: &str, site: Arc<SiteFetcher>, config: CrawlerConfig) -> (CrawlReport, TempDir) {
    let dir = TempDir::new().unwrap();
    let report = build_engine(seed, site, &config, dir.path(), OutputMode::Tree)
        .run_until(std::future::pending())
        .await
        .unwrap();
    (report, dir)
}

fn state_of(report: &CrawlReport, url: &str) -> TaskState {
    report
        .outcome(url)
        .unwrap_or_else(|| panic!("no outcome for {}", url))
        .state
}

#[tokio::test]
async fn test_max_depth_zero_fetches_only_seed() {
    let site = Arc::new(
        SiteFetcher::default()
            .html(
                "https://ex.com/docs",
                doc_page("Docs", &["/docs/a", "/docs/b"]),
            )
            .html("https://ex.com/docs/a", doc_page("A", &[])),
    );

    let (report, dir) = run_tree("https://ex.com/docs", site.clone(), crawler_config(0, 5)).await;

    assert_eq!(site.fetched(), vec!["https://ex.com/docs".to_string()]);
    assert_eq!(report.stats.succeeded, 1);
    assert_eq!(report.stats.discovered, 1);
    assert!(dir.path().join("docs.md").exists());
}

#[tokio::test]
async fn test_docs_scenario_stays_on_site() {
    let site = Arc::new(
        SiteFetcher::default()
            .html(
                "https://ex.com/docs",
                doc_page("Docs", &["https://ex.com/docs/a", "https://other.com/x"]),
            )
            .html("https://ex.com/docs/a", doc_page("Page A", &["/docs/b"])),
    );

    let (report, dir) = run_tree("https://ex.com/docs", site.clone(), crawler_config(1, 5)).await;

    assert_eq!(site.fetch_count("https://other.com/x"), 0);
    // /docs/b sits at depth 2
    assert_eq!(site.fetch_count("https://ex.com/docs/b"), 0);

    let depth_one: Vec<_> = report
        .admission_order
        .iter()
        .filter(|t| t.depth == 1)
        .map(|t| t.url.as_str())
        .collect();
    assert_eq!(depth_one, vec!["https://ex.com/docs/a"]);

    assert_eq!(state_of(&report, "https://ex.com/docs"), TaskState::Done);
    assert_eq!(state_of(&report, "https://ex.com/docs/a"), TaskState::Done);

    let seed_page = std::fs::read_to_string(dir.path().join("docs.md")).unwrap();
    assert!(seed_page.starts_with("# Docs\n"));
    assert!(seed_page.contains("guide explains how the feature works"));
    assert!(!seed_page.contains("Copyright"));

    let child = std::fs::read_to_string(dir.path().join("docs/a.md")).unwrap();
    assert!(child.starts_with("# Page A\n"));

    let summary = std::fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
    assert!(summary.contains("- [Docs](docs.md)"));
    assert!(summary.contains("- [Page A](docs/a.md)"));
}

#[tokio::test]
async fn test_trailing_slash_variants_get_distinct_files() {
    let site = Arc::new(
        SiteFetcher::default()
            .html(
                "https://ex.com/",
                doc_page("Home", &["https://ex.com/a", "https://ex.com/a/"]),
            )
            .html("https://ex.com/a", doc_page("Page", &[]))
            .html("https://ex.com/a/", doc_page("Section", &[])),
    );

    let (report, dir) = run_tree("https://ex.com/", site, crawler_config(1, 5)).await;

    assert_eq!(report.stats.succeeded, 3);
    let page = std::fs::read_to_string(dir.path().join("a.md")).unwrap();
    let section = std::fs::read_to_string(dir.path().join("a").join("index.md")).unwrap();
    assert!(page.starts_with("# Page"));
    assert!(section.starts_with("# Section"));
    assert!(dir.path().join("index.md").exists());
}

#[tokio::test]
async fn test_http_500_child_fails_while_siblings_complete() {
    let site = Arc::new(
        SiteFetcher::default()
            .html(
                "https://ex.com/docs",
                doc_page("Docs", &["/docs/a", "/docs/b", "/docs/c"]),
            )
            .html("https://ex.com/docs/a", doc_page("A", &[]))
            .result(
                "https://ex.com/docs/b",
                FetchResult::HttpError { status_code: 500 },
            )
            .html("https://ex.com/docs/c", doc_page("C", &[])),
    );

    let (report, dir) = run_tree("https://ex.com/docs", site, crawler_config(1, 5)).await;

    assert!(!report.interrupted);
    assert_eq!(state_of(&report, "https://ex.com/docs/a"), TaskState::Done);
    assert_eq!(state_of(&report, "https://ex.com/docs/c"), TaskState::Done);

    let failed = report.outcome("https://ex.com/docs/b").unwrap();
    assert_eq!(failed.state, TaskState::Failed);
    assert_eq!(
        failed.error,
        Some(PageError::FetchFailure(FetchFailure::Http(500)))
    );

    assert_eq!(report.stats.succeeded, 3);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.error_summary.get("fetch-http"), Some(&1));
    assert!(!dir.path().join("docs/b.md").exists());
}

#[tokio::test]
async fn test_admission_is_breadth_first() {
    let slow = Duration::from_millis(150);
    let site = Arc::new(
        SiteFetcher::default()
            .html("https://ex.com/", doc_page("Root", &["/a", "/b"]))
            .html("https://ex.com/a", doc_page("A", &["/a/1"]))
            .html("https://ex.com/b", doc_page("B", &["/b/1"]))
            .delay("https://ex.com/b", slow)
            .html("https://ex.com/a/1", doc_page("A1", &["/a/1/x"]))
            .html("https://ex.com/b/1", doc_page("B1", &[]))
            .html("https://ex.com/a/1/x", doc_page("A1X", &[])),
    );

    let (report, _dir) = run_tree("https://ex.com/", site, crawler_config(3, 5)).await;

    let depths: Vec<u32> = report.admission_order.iter().map(|t| t.depth).collect();
    assert_eq!(depths.len(), 6);
    assert!(
        depths.windows(2).all(|w| w[0] <= w[1]),
        "admission order not breadth-first: {:?}",
        depths
    );

    let position = |url: &str| {
        report
            .admission_order
            .iter()
            .position(|t| t.url.as_str() == url)
            .unwrap()
    };
    assert!(position("https://ex.com/b/1") < position("https://ex.com/a/1/x"));
    assert_eq!(report.admission_order[0].url.as_str(), "https://ex.com/");
}

#[tokio::test]
async fn test_no_url_is_fetched_twice() {
    let links = [
        "/",
        "/a",
        "/b",
        "/c",
        "/a#install",
        "https://EX.com/b",
        "/c?utm_source=nav",
        "./a",
    ];
    let site = Arc::new(
        SiteFetcher::default()
            .html("https://ex.com/", doc_page("Root", &links))
            .html("https://ex.com/a", doc_page("A", &links))
            .html("https://ex.com/b", doc_page("B", &links))
            .html("https://ex.com/c", doc_page("C", &links)),
    );

    let (report, _dir) = run_tree("https://ex.com/", site.clone(), crawler_config(5, 8)).await;

    let fetched = site.fetched();
    assert_eq!(fetched.len(), 4, "fetched: {:?}", fetched);
    for url in ["https://ex.com/", "https://ex.com/a", "https://ex.com/b", "https://ex.com/c"] {
        assert_eq!(site.fetch_count(url), 1, "{} fetched more than once", url);
    }
    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.stats.discovered, 4);
}

#[tokio::test]
async fn test_redirect_onto_visited_page_is_skipped() {
    let site = Arc::new(
        SiteFetcher::default()
            .html(
                "https://ex.com/docs",
                doc_page("Docs", &["/docs/old", "/docs/new"]),
            )
            .redirect(
                "https://ex.com/docs/old",
                "https://ex.com/docs/new",
                doc_page("New", &[]),
            )
            .html("https://ex.com/docs/new", doc_page("New", &[])),
    );

    let (report, _dir) = run_tree("https://ex.com/docs", site, crawler_config(1, 5)).await;

    let old = report.outcome("https://ex.com/docs/old").unwrap();
    assert_eq!(old.state, TaskState::Skipped);
    assert!(matches!(old.error, Some(PageError::AlreadyVisited(_))));
    assert_eq!(state_of(&report, "https://ex.com/docs/new"), TaskState::Done);
    assert_eq!(report.pages.len(), 2);
}

#[tokio::test]
async fn test_page_without_content_is_skipped_but_followed() {
    let nav_only = r#"<html><body><nav><a href="/docs/a">A</a></nav></body></html>"#;
    let site = Arc::new(
        SiteFetcher::default()
            .html("https://ex.com/docs", nav_only.to_string())
            .html("https://ex.com/docs/a", doc_page("A", &[])),
    );

    let (report, _dir) = run_tree("https://ex.com/docs", site, crawler_config(1, 5)).await;

    let seed = report.outcome("https://ex.com/docs").unwrap();
    assert_eq!(seed.state, TaskState::Skipped);
    assert_eq!(seed.error, Some(PageError::EmptyContent));
    assert_eq!(state_of(&report, "https://ex.com/docs/a"), TaskState::Done);
}

#[tokio::test]
async fn test_non_html_child_is_skipped() {
    let site = Arc::new(
        SiteFetcher::default()
            .html("https://ex.com/", doc_page("Home", &["/manual.pdf"]))
            .result(
                "https://ex.com/manual.pdf",
                FetchResult::ContentMismatch {
                    content_type: "application/pdf".to_string(),
                },
            ),
    );

    let (report, _dir) = run_tree("https://ex.com/", site, crawler_config(1, 5)).await;

    let pdf = report.outcome("https://ex.com/manual.pdf").unwrap();
    assert_eq!(pdf.state, TaskState::Skipped);
    assert!(matches!(pdf.error, Some(PageError::ContentMismatch(_))));
    assert_eq!(report.stats.skipped, 1);
}

#[tokio::test]
async fn test_unreachable_seed_is_an_error() {
    let site = Arc::new(SiteFetcher::default().result(
        "https://ex.com/docs",
        FetchResult::NetworkError {
            error: "connection refused".to_string(),
        },
    ));
    let dir = TempDir::new().unwrap();

    let result = build_engine(
        "https://ex.com/docs",
        site,
        &crawler_config(2, 5),
        dir.path(),
        OutputMode::Tree,
    )
    .run_until(std::future::pending())
    .await;

    assert!(matches!(result, Err(DocsError::SeedUnreachable { .. })));
}

#[tokio::test]
async fn test_single_mode_writes_one_document() {
    let site = Arc::new(
        SiteFetcher::default()
            .html("https://ex.com/docs", doc_page("Docs", &["/docs/a", "/docs/b"]))
            .html("https://ex.com/docs/a", doc_page("Alpha", &[]))
            .html("https://ex.com/docs/b", doc_page("Beta", &[])),
    );
    let dir = TempDir::new().unwrap();

    let report = build_engine(
        "https://ex.com/docs",
        site,
        &crawler_config(1, 1),
        dir.path(),
        OutputMode::Single,
    )
    .run_until(std::future::pending())
    .await
    .unwrap();

    assert_eq!(report.summary_path, Some(dir.path().join(SINGLE_FILE)));
    let document = std::fs::read_to_string(dir.path().join(SINGLE_FILE)).unwrap();
    let docs = document.find("# Docs").unwrap();
    let alpha = document.find("# Alpha").unwrap();
    let beta = document.find("# Beta").unwrap();
    assert!(docs < alpha && alpha < beta);
    assert_eq!(document.matches("\n---\n").count(), 3);
    assert!(!dir.path().join("docs.md").exists());
}

#[tokio::test]
async fn test_interrupt_drains_running_tasks() {
    let slow = Duration::from_millis(300);
    let site = Arc::new(
        SiteFetcher::default()
            .html("https://ex.com/", doc_page("Home", &["/a", "/b", "/c"]))
            .html("https://ex.com/a", doc_page("A", &[]))
            .html("https://ex.com/b", doc_page("B", &[]))
            .html("https://ex.com/c", doc_page("C", &[]))
            .delay("https://ex.com/a", slow)
            .delay("https://ex.com/b", slow)
            .delay("https://ex.com/c", slow),
    );
    let dir = TempDir::new().unwrap();

    let report = build_engine(
        "https://ex.com/",
        site,
        &crawler_config(1, 1),
        dir.path(),
        OutputMode::Tree,
    )
    .run_until(tokio::time::sleep(Duration::from_millis(100)))
    .await
    .unwrap();

    assert!(report.interrupted);
    assert!(report.admission_order.len() < 4);
    // Every admitted task finished before the engine returned
    assert_eq!(report.outcomes.len(), report.admission_order.len());
    assert!(dir.path().join(SUMMARY_FILE).exists());
}

#[tokio::test]
async fn test_http_seed_upgraded_to_https_is_crawled() {
    let site = Arc::new(
        SiteFetcher::default()
            .redirect(
                "http://ex.com/docs",
                "https://ex.com/docs",
                doc_page("Docs", &["/docs/a"]),
            )
            .html("https://ex.com/docs/a", doc_page("A", &[])),
    );

    let (report, dir) = run_tree("http://ex.com/docs", site.clone(), crawler_config(1, 5)).await;

    let seed = report.outcome("http://ex.com/docs").unwrap();
    assert_eq!(seed.state, TaskState::Done);
    assert_eq!(state_of(&report, "https://ex.com/docs/a"), TaskState::Done);
    assert_eq!(report.stats.succeeded, 2);

    let written = seed.path.as_ref().unwrap();
    assert!(dir.path().join(written).exists());
}

#[tokio::test]
async fn test_write_failure_leaves_siblings_running() {
    let site = Arc::new(
        SiteFetcher::default()
            .html(
                "https://ex.com/docs",
                doc_page("Docs", &["/docs/a", "/docs/b", "/docs/c"]),
            )
            .html("https://ex.com/docs/a", doc_page("A", &[]))
            .html("https://ex.com/docs/b", doc_page("B", &[]))
            .html("https://ex.com/docs/c", doc_page("C", &[])),
    );
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("docs")).unwrap();
    std::fs::write(dir.path().join("docs").join("b.md"), "kept").unwrap();

    let report = build_engine(
        "https://ex.com/docs",
        site,
        &crawler_config(1, 5),
        dir.path(),
        OutputMode::Tree,
    )
    .run_until(std::future::pending())
    .await
    .unwrap();

    let failed = report.outcome("https://ex.com/docs/b").unwrap();
    assert_eq!(failed.state, TaskState::Failed);
    assert!(matches!(failed.error, Some(PageError::WriteFailure(_))));
    assert_eq!(state_of(&report, "https://ex.com/docs/a"), TaskState::Done);
    assert_eq!(state_of(&report, "https://ex.com/docs/c"), TaskState::Done);
    assert_eq!(report.stats.succeeded, 3);
    assert_eq!(report.stats.error_summary.get("write-failure"), Some(&1));

    let existing = std::fs::read_to_string(dir.path().join("docs").join("b.md")).unwrap();
    assert_eq!(existing, "kept");
}

#[tokio::test]
async fn test_model_filter_keeps_pages_when_classifier_fails() {
    let site = Arc::new(
        SiteFetcher::default()
            .html("https://ex.com/docs", doc_page("Docs", &["/docs/a"]))
            .html("https://ex.com/docs/a", doc_page("A", &[])),
    );
    let dir = TempDir::new().unwrap();
    let filter = ContentFilter::ModelBased(ModelFilter::new(Arc::new(UnavailableClassifier), 400));

    let report = build_engine_with(
        "https://ex.com/docs",
        site,
        &crawler_config(1, 5),
        dir.path(),
        filter,
        Arc::new(Html2MdConverter),
    )
    .run_until(std::future::pending())
    .await
    .unwrap();

    assert_eq!(state_of(&report, "https://ex.com/docs"), TaskState::Done);
    assert_eq!(state_of(&report, "https://ex.com/docs/a"), TaskState::Done);
    assert!(report.stats.classification_failures >= 2);
    assert!(report
        .stats
        .error_summary
        .contains_key("classification-failure"));

    let page = std::fs::read_to_string(dir.path().join("docs").join("a.md")).unwrap();
    assert!(page.contains("guide explains how the feature works"));
}

#[tokio::test]
async fn test_panicking_worker_does_not_stall_deeper_levels() {
    let site = Arc::new(
        SiteFetcher::default()
            .html("https://ex.com/", doc_page("Home", &["/a", "/b"]))
            .html("https://ex.com/a", doc_page("Exploding", &[]))
            .html("https://ex.com/b", doc_page("B", &["/c"]))
            .html("https://ex.com/c", doc_page("C", &["/d"]))
            .html("https://ex.com/d", doc_page("D", &[])),
    );
    let dir = TempDir::new().unwrap();

    let report = build_engine_with(
        "https://ex.com/",
        site.clone(),
        &crawler_config(3, 5),
        dir.path(),
        ContentFilter::Heuristic(Default::default()),
        Arc::new(PanickingConverter),
    )
    .run_until(std::future::pending())
    .await
    .unwrap();

    assert_eq!(site.fetch_count("https://ex.com/d"), 1);
    assert_eq!(state_of(&report, "https://ex.com/d"), TaskState::Done);

    let lost = report.outcome("https://ex.com/a").unwrap();
    assert_eq!(lost.state, TaskState::Failed);
    assert!(matches!(lost.error, Some(PageError::WorkerPanic(_))));
    assert_eq!(report.outcomes.len(), report.admission_order.len());
    assert_eq!(report.stats.error_summary.get("worker-panic"), Some(&1));
}

fn http_config(dir: &TempDir, mode: OutputMode) -> Config {
    let mut config = Config::default();
    config.crawler.max_depth = 1;
    config.crawler.request_timeout_secs = 5;
    config.output = OutputConfig {
        directory: dir.path().display().to_string(),
        doc_name: "site".to_string(),
        mode,
        overwrite: false,
    };
    config
}

fn html_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(html_response(doc_page(
            "Docs",
            &[
                &format!("{}/docs/intro", base_url),
                "/docs/missing",
                "https://other.example/x",
            ],
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/intro"))
        .respond_with(html_response(doc_page("Intro", &["/docs/deeper"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/deeper"))
        .respond_with(html_response(doc_page("Deeper", &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = http_config(&dir, OutputMode::Tree);
    let seed = Url::parse(&format!("{}/docs", base_url)).unwrap();

    let report = crawl(&config, &seed).await.unwrap();

    assert_eq!(report.stats.succeeded, 2);
    assert_eq!(report.stats.failed, 1);

    let root = dir.path().join("site");
    let intro = std::fs::read_to_string(root.join("docs").join("intro.md")).unwrap();
    assert!(intro.starts_with("# Intro"));
    let summary = std::fs::read_to_string(root.join(SUMMARY_FILE)).unwrap();
    assert!(summary.contains("[Intro](docs/intro.md)"));
    assert!(!summary.contains("missing"));
}

#[tokio::test]
async fn test_crawl_refuses_non_empty_output_root() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html_response(doc_page("Docs", &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("site")).unwrap();
    std::fs::write(dir.path().join("site").join("keep.md"), "old").unwrap();

    let config = http_config(&dir, OutputMode::Tree);
    let seed = Url::parse(&format!("{}/docs", mock_server.uri())).unwrap();

    let result = crawl(&config, &seed).await;
    assert!(matches!(result, Err(DocsError::OutputRoot { .. })));
    assert!(dir.path().join("site").join("keep.md").exists());
}
