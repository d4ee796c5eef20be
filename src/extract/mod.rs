//! Hybrid text-extraction pipeline.
//!
//! Given a URL, decide which extraction strategy wins: a headless-browser
//! render, a JSON-LD salvage of the rendered HTML, or a direct HTTP fetch
//! with markup stripping. Render output goes through a quality gate; weak
//! output escalates to salvage, then to the fallback fetch, and the final
//! outcome always carries diagnostics for every path that was tried.
//!
//! The submodules are leaves; `orchestrator` sequences them.

pub mod block;
pub mod orchestrator;
pub mod quality;
pub mod salvage;

pub use orchestrator::ExtractionOrchestrator;

use crate::error::ErrorTag;
use crate::renderer::RenderMethod;
use serde::Serialize;
use std::collections::BTreeMap;

/// Quality verdict recorded in diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    /// Nothing noteworthy: text was long enough or extraction failed outright.
    #[default]
    None,
    /// The target actively resisted automated access.
    Blocked,
    /// Short text from a method that suggests hidden page structure.
    WeakExtraction,
    /// Short text from an ordinary render or fetch.
    LowText,
}

/// What the render attempt looked like, after sanitization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderDiagnostics {
    pub ok: bool,
    pub http_status: Option<u16>,
    pub final_url: String,
    pub method: RenderMethod,
    pub text_len: usize,
    pub timings: BTreeMap<String, f64>,
    pub errors: Vec<String>,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_override: Option<RenderMethod>,
    pub assessment: Assessment,
}

/// Whether and how the direct-fetch fallback was exercised.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchDiagnostics {
    pub used: bool,
    pub status_code: Option<u16>,
    pub elapsed_ms: Option<u64>,
}

/// Everything the pipeline learned during one extraction, regardless of
/// which path won.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub render: Option<RenderDiagnostics>,
    pub direct_fetch: FetchDiagnostics,
}

/// Terminal value of one extraction.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    /// Normalized text, absent on hard failure.
    pub text: Option<String>,
    /// Which strategy won, e.g. "render(dom)", "render(jsonld)", "direct-fetch".
    pub source: String,
    pub scrape_time_ms: u64,
    pub truncated: bool,
    pub error: Option<ErrorTag>,
    pub diagnostics: Diagnostics,
    /// Set when the returned text is suspiciously short.
    pub warning: Option<String>,
}

impl ExtractionOutcome {
    /// True when usable text was produced.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.text.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assessment_wire_names() {
        assert_eq!(serde_json::to_string(&Assessment::None).unwrap(), "\"none\"");
        assert_eq!(
            serde_json::to_string(&Assessment::WeakExtraction).unwrap(),
            "\"weak_extraction\""
        );
        assert_eq!(serde_json::to_string(&Assessment::LowText).unwrap(), "\"low_text\"");
    }

    #[test]
    fn test_method_override_omitted_when_absent() {
        let diag = RenderDiagnostics {
            ok: true,
            http_status: Some(200),
            final_url: "http://example.com".into(),
            method: RenderMethod::Dom,
            text_len: 12,
            timings: BTreeMap::new(),
            errors: vec![],
            blocked: false,
            method_override: None,
            assessment: Assessment::None,
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert!(json.get("method_override").is_none());
        assert_eq!(json["assessment"], "none");
    }
}
