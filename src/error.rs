//! Error types shared across the extraction pipeline and API boundary.

use serde::{Deserialize, Serialize};

/// Stable error tags surfaced in diagnostics and API responses.
///
/// Render-path tags cover the subprocess renderer; `requests_*` tags cover
/// the direct-fetch fallback. The string forms are part of the wire contract
/// and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorTag {
    RenderFailed,
    RenderEmpty,
    RenderTimeout,
    RuntimeNotFound,
    RenderError,
    Blocked,
    RequestsTimeout,
    RequestsError,
    RequestsEmpty,
}

impl ErrorTag {
    /// The wire string for this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorTag::RenderFailed => "render_failed",
            ErrorTag::RenderEmpty => "render_empty",
            ErrorTag::RenderTimeout => "render_timeout",
            ErrorTag::RuntimeNotFound => "runtime_not_found",
            ErrorTag::RenderError => "render_error",
            ErrorTag::Blocked => "blocked",
            ErrorTag::RequestsTimeout => "requests_timeout",
            ErrorTag::RequestsError => "requests_error",
            ErrorTag::RequestsEmpty => "requests_empty",
        }
    }
}

impl std::fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in the defacewatch library.
#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("extraction failed: {0}")]
    Extraction(ErrorTag),

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type WatchResult<T> = Result<T, WatchError>;
