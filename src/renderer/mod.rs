//! Page rendering via an external headless-browser subprocess.
//!
//! The renderer is an external node script with a JSON stdout contract; this
//! module defines the `PageRenderer` trait the pipeline consumes and the
//! structured result of one attempt. Invocation faults never escape as
//! errors: every failure mode is folded into a `RenderAttempt` with a stable
//! error tag so the orchestrator can branch on data, not exceptions.

pub mod node;

use crate::error::ErrorTag;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Method tags ─────────────────────────────────────────────────────────────

/// Strategy the renderer reports having used to pull text out of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderMethod {
    /// Plain DOM innerText walk.
    #[serde(rename = "dom")]
    Dom,
    /// Text recovered from same-origin iframes.
    #[serde(rename = "iframe")]
    Iframe,
    /// Text recovered by piercing open shadow roots.
    #[serde(rename = "shadowdom")]
    ShadowDom,
    /// TreeWalker traversal over raw text nodes.
    #[serde(rename = "treewalker")]
    TreeWalker,
    /// Renderer predates the JSON contract and wrote bare text to stdout.
    #[serde(rename = "legacy_stdout")]
    LegacyStdout,
    /// Text recovered from embedded JSON-LD after the fact.
    #[serde(rename = "jsonld")]
    JsonLd,
    /// No specific method claimed, or an unrecognized tag.
    #[serde(other, rename = "fallback")]
    Fallback,
}

impl RenderMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMethod::Dom => "dom",
            RenderMethod::Iframe => "iframe",
            RenderMethod::ShadowDom => "shadowdom",
            RenderMethod::TreeWalker => "treewalker",
            RenderMethod::LegacyStdout => "legacy_stdout",
            RenderMethod::JsonLd => "jsonld",
            RenderMethod::Fallback => "fallback",
        }
    }

    /// Methods that indicate the page hid its text behind an iframe or
    /// shadow DOM. Short text from these reads as a structural problem with
    /// the page rather than a genuinely text-poor page.
    pub fn is_weak_dom_path(&self) -> bool {
        matches!(
            self,
            RenderMethod::Iframe | RenderMethod::ShadowDom | RenderMethod::TreeWalker
        )
    }
}

impl std::fmt::Display for RenderMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Attempt result ──────────────────────────────────────────────────────────

/// Outcome of one renderer invocation. Constructed once, never mutated;
/// the orchestrator folds it into diagnostics.
#[derive(Debug, Clone)]
pub struct RenderAttempt {
    /// Renderer-level success. Text may still be empty when true.
    pub ok: bool,
    pub text: Option<String>,
    /// Renderer-reported text length, for diagnostics.
    pub text_len: usize,
    /// URL after redirects, when the renderer got far enough to know it.
    pub final_url: Option<String>,
    pub http_status: Option<u16>,
    pub method: RenderMethod,
    /// Sub-phase durations in milliseconds as reported by the renderer.
    pub timings: BTreeMap<String, f64>,
    /// Raw error strings; sanitized by the orchestrator before they reach
    /// diagnostics.
    pub errors: Vec<String>,
}

impl RenderAttempt {
    /// A failed attempt carrying only a stable error tag.
    pub fn failure(tag: ErrorTag) -> Self {
        Self {
            ok: false,
            text: None,
            text_len: 0,
            final_url: None,
            http_status: None,
            method: RenderMethod::Fallback,
            timings: BTreeMap::new(),
            errors: vec![tag.as_str().to_string()],
        }
    }

    /// A failed attempt with an extra detail line after the tag.
    pub fn failure_with_detail(tag: ErrorTag, detail: impl Into<String>) -> Self {
        let mut attempt = Self::failure(tag);
        attempt.errors.push(detail.into());
        attempt
    }

    /// The renderer's own end-to-end duration, when reported.
    pub fn total_ms(&self) -> Option<f64> {
        self.timings.get("total_ms").copied()
    }
}

/// Per-call invocation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Ask the renderer to persist the rendered HTML to the debug directory
    /// so the JSON-LD salvage path can read it back.
    pub persist_html: bool,
}

/// A renderer the extraction pipeline can drive. Implementations must not
/// return errors; every failure becomes a `RenderAttempt` with an error tag.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, opts: RenderOptions) -> RenderAttempt;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_wire_names() {
        assert_eq!(
            serde_json::to_string(&RenderMethod::ShadowDom).unwrap(),
            "\"shadowdom\""
        );
        assert_eq!(
            serde_json::to_string(&RenderMethod::LegacyStdout).unwrap(),
            "\"legacy_stdout\""
        );
        let m: RenderMethod = serde_json::from_str("\"treewalker\"").unwrap();
        assert_eq!(m, RenderMethod::TreeWalker);
    }

    #[test]
    fn test_unknown_method_maps_to_fallback() {
        let m: RenderMethod = serde_json::from_str("\"quantum\"").unwrap();
        assert_eq!(m, RenderMethod::Fallback);
    }

    #[test]
    fn test_weak_dom_paths() {
        assert!(RenderMethod::Iframe.is_weak_dom_path());
        assert!(RenderMethod::ShadowDom.is_weak_dom_path());
        assert!(RenderMethod::TreeWalker.is_weak_dom_path());
        assert!(!RenderMethod::Dom.is_weak_dom_path());
        assert!(!RenderMethod::LegacyStdout.is_weak_dom_path());
    }

    #[test]
    fn test_failure_carries_tag_as_error_string() {
        let attempt = RenderAttempt::failure(ErrorTag::RenderTimeout);
        assert!(!attempt.ok);
        assert_eq!(attempt.errors, vec!["render_timeout"]);
        assert_eq!(attempt.method, RenderMethod::Fallback);
        assert!(attempt.total_ms().is_none());
    }

    #[test]
    fn test_total_ms_reads_timings() {
        let mut attempt = RenderAttempt::failure(ErrorTag::RenderEmpty);
        attempt.timings.insert("total_ms".into(), 431.7);
        assert_eq!(attempt.total_ms(), Some(431.7));
    }
}
