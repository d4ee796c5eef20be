//! Direct-fetch fallback extractor.
//!
//! A plain GET with a browser user-agent, lenient TLS, and bounded
//! redirects, followed by markup stripping. Defaced pages frequently sit
//! behind broken or self-signed certificates, so certificate validation is
//! deliberately off here.
//!
//! `fetch` never returns an error: every failure mode is folded into the
//! `FetchAttempt` so the orchestrator can branch on data.

use crate::config::Settings;
use crate::error::ErrorTag;
use scraper::{Html, Node};
use std::time::Instant;
use tracing::debug;

/// Why a fetch attempt produced no usable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The request exceeded the configured timeout.
    Timeout,
    /// The server answered with a non-success status.
    HttpStatus(u16),
    /// Connection, TLS, or body-read fault.
    Transport(String),
}

impl FetchFailure {
    /// Stable tag for diagnostics and API error fields.
    pub fn tag(&self) -> ErrorTag {
        match self {
            FetchFailure::Timeout => ErrorTag::RequestsTimeout,
            FetchFailure::HttpStatus(_) | FetchFailure::Transport(_) => ErrorTag::RequestsError,
        }
    }
}

/// Outcome of one direct-fetch attempt. Text is markup-stripped but not yet
/// normalized; the quality gate owns normalization.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub status: Option<u16>,
    pub elapsed_ms: u64,
    pub text: Option<String>,
    pub failure: Option<FetchFailure>,
}

/// Direct HTTP GET client for the fallback path.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(settings.user_agent.clone())
            .danger_accept_invalid_certs(true)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// GET the URL and strip markup from the body.
    pub async fn fetch(&self, url: &str) -> FetchAttempt {
        let start = Instant::now();
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                let failure = if e.is_timeout() {
                    FetchFailure::Timeout
                } else {
                    FetchFailure::Transport(e.to_string())
                };
                return FetchAttempt {
                    status: None,
                    elapsed_ms: elapsed_ms(start),
                    text: None,
                    failure: Some(failure),
                };
            }
        };

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return FetchAttempt {
                status: Some(status),
                elapsed_ms: elapsed_ms(start),
                text: None,
                failure: Some(FetchFailure::HttpStatus(status)),
            };
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let failure = if e.is_timeout() {
                    FetchFailure::Timeout
                } else {
                    FetchFailure::Transport(e.to_string())
                };
                return FetchAttempt {
                    status: Some(status),
                    elapsed_ms: elapsed_ms(start),
                    text: None,
                    failure: Some(failure),
                };
            }
        };

        let text = strip_markup(&body);
        debug!("direct fetch {url}: status={status} stripped_len={}", text.chars().count());
        FetchAttempt {
            status: Some(status),
            elapsed_ms: elapsed_ms(start),
            text: Some(text),
            failure: None,
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Concatenate the document's text nodes, dropping script, style, and
/// noscript subtrees. Whitespace between tags survives; the quality gate
/// collapses it later.
pub fn strip_markup(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    for node in document.tree.nodes() {
        if let Node::Text(text) = node.value() {
            let hidden = node.ancestors().any(|a| match a.value() {
                Node::Element(el) => matches!(el.name(), "script" | "style" | "noscript"),
                _ => false,
            });
            if !hidden {
                out.push_str(text);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup_drops_script_and_style() {
        let html = r#"
            <html><head>
              <style>body { color: red; }</style>
              <script>var hidden = "secret";</script>
            </head>
            <body>
              <h1>Site News</h1>
              <p>All services operational.</p>
              <noscript>Enable JavaScript</noscript>
            </body></html>
        "#;
        let text = strip_markup(html);
        assert!(text.contains("Site News"));
        assert!(text.contains("All services operational."));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("secret"));
        assert!(!text.contains("Enable JavaScript"));
    }

    #[test]
    fn test_strip_markup_keeps_nested_text() {
        let html = "<div><p>outer <b>bold <i>deep</i></b> tail</p></div>";
        let text = strip_markup(html);
        assert!(text.contains("outer"));
        assert!(text.contains("bold"));
        assert!(text.contains("deep"));
        assert!(text.contains("tail"));
    }

    #[test]
    fn test_failure_tags() {
        assert_eq!(FetchFailure::Timeout.tag(), ErrorTag::RequestsTimeout);
        assert_eq!(FetchFailure::HttpStatus(500).tag(), ErrorTag::RequestsError);
        assert_eq!(
            FetchFailure::Transport("tls handshake".into()).tag(),
            ErrorTag::RequestsError
        );
    }
}
