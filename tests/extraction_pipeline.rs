//! Extraction pipeline integration tests.
//!
//! Drives the orchestrator with a scripted renderer and a wiremock HTTP
//! server to cover the decision matrix: accepted render, blocked target,
//! JSON-LD salvage, render-over-fetch preference, and terminal failures.

use async_trait::async_trait;
use defacewatch::acquisition::HttpFetcher;
use defacewatch::config::Settings;
use defacewatch::error::ErrorTag;
use defacewatch::extract::{Assessment, ExtractionOrchestrator};
use defacewatch::renderer::{PageRenderer, RenderAttempt, RenderMethod, RenderOptions};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Scripted renderer ──

struct FakeRenderer {
    responses: Mutex<VecDeque<RenderAttempt>>,
    calls: AtomicUsize,
    /// HTML written into this directory when persistence is requested.
    persist: Option<(PathBuf, String)>,
}

impl FakeRenderer {
    fn new(responses: Vec<RenderAttempt>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
            persist: None,
        }
    }

    fn with_persisted_html(mut self, dir: &Path, html: &str) -> Self {
        self.persist = Some((dir.to_path_buf(), html.to_string()));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(&self, url: &str, opts: RenderOptions) -> RenderAttempt {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if opts.persist_html {
            if let Some((dir, html)) = &self.persist {
                let host = url::Url::parse(url)
                    .ok()
                    .and_then(|u| u.host_str().map(String::from))
                    .unwrap_or_else(|| "page".into());
                let stamp = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap()
                    .as_nanos();
                std::fs::create_dir_all(dir).unwrap();
                std::fs::write(dir.join(format!("{host}_{stamp}.html")), html).unwrap();
            }
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RenderAttempt::failure(ErrorTag::RenderError))
    }
}

// ── Builders ──

fn ok_attempt(text: &str, render_method: RenderMethod) -> RenderAttempt {
    let mut timings = BTreeMap::new();
    timings.insert("total_ms".to_string(), 120.0);
    RenderAttempt {
        ok: true,
        text: Some(text.to_string()),
        text_len: text.chars().count(),
        final_url: None,
        http_status: Some(200),
        method: render_method,
        timings,
        errors: vec![],
    }
}

fn status_attempt(status: u16) -> RenderAttempt {
    let mut attempt = ok_attempt("", RenderMethod::Dom);
    attempt.http_status = Some(status);
    attempt
}

fn test_settings(debug_dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.debug_html_dir = Some(debug_dir.to_path_buf());
    settings.request_timeout_ms = 2_000;
    settings
}

fn build_orchestrator(
    renderer: Arc<FakeRenderer>,
    settings: Settings,
) -> ExtractionOrchestrator {
    let settings = Arc::new(settings);
    let fetcher = HttpFetcher::new(&settings);
    ExtractionOrchestrator::new(renderer, fetcher, settings)
}

async fn mock_page(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
        .mount(server)
        .await;
}

// ── Accepted render ──

#[tokio::test]
async fn test_accepted_render_skips_fallback() {
    let debug = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let long_text = "genuine page content ".repeat(250);
    let renderer = Arc::new(FakeRenderer::new(vec![ok_attempt(&long_text, RenderMethod::Dom)]));
    let orchestrator = build_orchestrator(renderer.clone(), test_settings(debug.path()));

    let outcome = orchestrator.extract(&server.uri()).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.source, "render(dom)");
    assert!(outcome.text.unwrap().chars().count() >= 200);
    assert!(outcome.warning.is_none());
    assert_eq!(renderer.calls(), 1, "no salvage re-render expected");
    let diag = outcome.diagnostics;
    assert!(!diag.direct_fetch.used);
    assert!(diag.direct_fetch.elapsed_ms.is_none());
    assert_eq!(diag.render.unwrap().assessment, Assessment::None);
    // Renderer-reported total wins over the wall clock.
    assert_eq!(outcome.scrape_time_ms, 120);
}

// ── Weak render escalates to fetch ──

#[tokio::test]
async fn test_weak_render_falls_back_to_accepted_fetch() {
    let debug = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let body = format!("<html><body><p>{}</p></body></html>", "x".repeat(600));
    mock_page(&server, &body).await;

    let renderer = Arc::new(FakeRenderer::new(vec![ok_attempt("short page", RenderMethod::Dom)]));
    let orchestrator = build_orchestrator(renderer.clone(), test_settings(debug.path()));

    let outcome = orchestrator.extract(&server.uri()).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.source, "direct-fetch");
    assert_eq!(outcome.text.unwrap().chars().count(), 600);
    assert!(outcome.warning.is_none(), "accepted fallback clears the weak warning");
    assert_eq!(renderer.calls(), 2, "salvage re-render before the fetch");
    let diag = outcome.diagnostics;
    assert!(diag.direct_fetch.used);
    assert_eq!(diag.direct_fetch.status_code, Some(200));
    assert_eq!(diag.render.unwrap().assessment, Assessment::LowText);
}

#[tokio::test]
async fn test_render_failure_and_fetch_timeout() {
    let debug = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1500)))
        .mount(&server)
        .await;

    let renderer = Arc::new(FakeRenderer::new(vec![RenderAttempt::failure_with_detail(
        ErrorTag::RenderFailed,
        "Error: net::ERR_CONNECTION_REFUSED",
    )]));
    let mut settings = test_settings(debug.path());
    settings.request_timeout_ms = 300;
    let orchestrator = build_orchestrator(renderer.clone(), settings);

    let outcome = orchestrator.extract(&server.uri()).await;

    assert!(outcome.text.is_none());
    assert_eq!(outcome.error, Some(ErrorTag::RequestsTimeout));
    assert_eq!(renderer.calls(), 1, "nothing to salvage without render text");
    let diag = outcome.diagnostics;
    assert!(diag.direct_fetch.used);
    let render = diag.render.unwrap();
    assert!(render
        .errors
        .iter()
        .any(|e| e == "Error: net::ERR_CONNECTION_REFUSED"));
}

#[tokio::test]
async fn test_empty_fetch_reports_requests_empty() {
    let debug = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mock_page(&server, "<html><body></body></html>").await;

    let renderer = Arc::new(FakeRenderer::new(vec![RenderAttempt::failure(
        ErrorTag::RenderEmpty,
    )]));
    let orchestrator = build_orchestrator(renderer, test_settings(debug.path()));

    let outcome = orchestrator.extract(&server.uri()).await;

    assert!(outcome.text.is_none());
    assert_eq!(outcome.error, Some(ErrorTag::RequestsEmpty));
    assert_eq!(outcome.source, "direct-fetch");
}

// ── Blocking ──

#[tokio::test]
async fn test_blocked_status_terminates_without_fallback() {
    let debug = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let renderer = Arc::new(FakeRenderer::new(vec![status_attempt(403)]));
    let orchestrator = build_orchestrator(renderer.clone(), test_settings(debug.path()));

    let outcome = orchestrator.extract(&server.uri()).await;

    assert!(outcome.text.is_none());
    assert_eq!(outcome.error, Some(ErrorTag::Blocked));
    assert_eq!(outcome.source, "render");
    assert_eq!(renderer.calls(), 1);
    let diag = outcome.diagnostics;
    assert!(!diag.direct_fetch.used, "strict policy must not record a fetch");
    let render = diag.render.unwrap();
    assert!(render.blocked);
    assert_eq!(render.assessment, Assessment::Blocked);
}

#[tokio::test]
async fn test_error_pattern_block_detection() {
    let debug = TempDir::new().unwrap();
    let server = MockServer::start().await;

    let renderer = Arc::new(FakeRenderer::new(vec![RenderAttempt::failure_with_detail(
        ErrorTag::RenderFailed,
        "Cloudflare challenge page detected",
    )]));
    let orchestrator = build_orchestrator(renderer, test_settings(debug.path()));

    let outcome = orchestrator.extract(&server.uri()).await;

    assert_eq!(outcome.error, Some(ErrorTag::Blocked));
    assert!(outcome.diagnostics.render.unwrap().blocked);
}

#[tokio::test]
async fn test_loose_block_policy_recovers_via_fetch() {
    let debug = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let body = format!("<html><body><p>{}</p></body></html>", "y".repeat(800));
    mock_page(&server, &body).await;

    let renderer = Arc::new(FakeRenderer::new(vec![status_attempt(429)]));
    let mut settings = test_settings(debug.path());
    settings.block_skips_fallback = false;
    let orchestrator = build_orchestrator(renderer.clone(), settings);

    let outcome = orchestrator.extract(&server.uri()).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.source, "direct-fetch");
    assert_eq!(renderer.calls(), 1, "no salvage against a challenge page");
    let diag = outcome.diagnostics;
    assert!(diag.direct_fetch.used);
    assert_eq!(diag.render.unwrap().assessment, Assessment::Blocked);
}

#[tokio::test]
async fn test_loose_block_policy_reports_block_when_fetch_fails() {
    let debug = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let renderer = Arc::new(FakeRenderer::new(vec![status_attempt(403)]));
    let mut settings = test_settings(debug.path());
    settings.block_skips_fallback = false;
    let orchestrator = build_orchestrator(renderer, settings);

    let outcome = orchestrator.extract(&server.uri()).await;

    assert!(outcome.text.is_none());
    // The block verdict outranks the fetch's own error tag.
    assert_eq!(outcome.error, Some(ErrorTag::Blocked));
    assert!(outcome.diagnostics.direct_fetch.used);
}

// ── JSON-LD salvage ──

#[tokio::test]
async fn test_jsonld_salvage_accepts() {
    let debug = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let article = "defaced content restored from structured data ".repeat(6);
    let html = format!(
        "<html><head><script type=\"application/ld+json\">{}</script></head><body></body></html>",
        serde_json::json!({ "@type": "NewsArticle", "articleBody": article })
    );
    let renderer = Arc::new(
        FakeRenderer::new(vec![
            ok_attempt("tiny", RenderMethod::Dom),
            ok_attempt("tiny", RenderMethod::Dom),
        ])
        .with_persisted_html(debug.path(), &html),
    );
    let orchestrator = build_orchestrator(renderer.clone(), test_settings(debug.path()));

    let outcome = orchestrator.extract(&server.uri()).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.source, "render(jsonld)");
    assert!(outcome.text.unwrap().chars().count() >= 200);
    assert!(outcome.warning.is_none());
    assert_eq!(renderer.calls(), 2);
    let diag = outcome.diagnostics;
    assert!(!diag.direct_fetch.used);
    let render = diag.render.unwrap();
    assert_eq!(render.method_override, Some(RenderMethod::JsonLd));
    assert_eq!(render.assessment, Assessment::LowText);
}

// ── Render preference over weak or failed fetch ──

#[tokio::test]
async fn test_weak_render_preferred_over_short_fetch() {
    let debug = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mock_page(&server, "<html><body><p>thirty characters of fetch</p></body></html>").await;

    let renderer = Arc::new(FakeRenderer::new(vec![ok_attempt(
        "weak but rendered text from the real page",
        RenderMethod::Dom,
    )]));
    let orchestrator = build_orchestrator(renderer, test_settings(debug.path()));

    let outcome = orchestrator.extract(&server.uri()).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.source, "render(dom)");
    assert_eq!(
        outcome.text.as_deref(),
        Some("weak but rendered text from the real page")
    );
    let warning = outcome.warning.expect("render preference carries a warning");
    assert!(warning.contains("blocked or rely on iframes"));
    assert!(outcome.diagnostics.direct_fetch.used);
}

#[tokio::test]
async fn test_weak_render_kept_when_fetch_fails() {
    let debug = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let renderer = Arc::new(FakeRenderer::new(vec![ok_attempt(
        "iframe fragment",
        RenderMethod::Iframe,
    )]));
    let orchestrator = build_orchestrator(renderer, test_settings(debug.path()));

    let outcome = orchestrator.extract(&server.uri()).await;

    assert!(outcome.is_success(), "weak render text beats a failed fetch");
    assert_eq!(outcome.source, "render(iframe)");
    assert_eq!(outcome.text.as_deref(), Some("iframe fragment"));
    assert!(outcome.warning.is_some());
    let diag = outcome.diagnostics;
    assert_eq!(diag.direct_fetch.status_code, Some(500));
    assert_eq!(diag.render.unwrap().assessment, Assessment::WeakExtraction);
}

#[tokio::test]
async fn test_short_fetch_alone_carries_warning() {
    let debug = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mock_page(&server, "<html><body><p>only a few words here</p></body></html>").await;

    let renderer = Arc::new(FakeRenderer::new(vec![RenderAttempt::failure(
        ErrorTag::RenderTimeout,
    )]));
    let orchestrator = build_orchestrator(renderer, test_settings(debug.path()));

    let outcome = orchestrator.extract(&server.uri()).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.source, "direct-fetch");
    assert_eq!(outcome.text.as_deref(), Some("only a few words here"));
    let warning = outcome.warning.expect("short fetch carries a warning");
    assert!(warning.contains("very short"));
    assert_eq!(
        outcome.diagnostics.render.unwrap().assessment,
        Assessment::LowText
    );
}
