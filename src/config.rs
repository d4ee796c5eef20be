//! Runtime configuration.
//!
//! Settings are loaded once from `DEFACEWATCH_*` environment variables at
//! startup and passed down by reference. There is no ambient global; every
//! component that needs configuration receives it explicitly.

use crate::error::{WatchError, WatchResult};
use std::path::PathBuf;
use std::time::Duration;

/// Default browser user-agent for the direct-fetch fallback.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36";

/// Immutable configuration snapshot.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Path to the node renderer script.
    pub renderer_script: PathBuf,
    /// Explicit node binary; when unset the runtime is resolved from PATH.
    pub node_binary: Option<PathBuf>,
    /// Path to the exported scoring model (JSON).
    pub model_path: PathBuf,
    /// Path to the tokenizer vocabulary (JSON).
    pub tokenizer_path: PathBuf,
    /// Padded token sequence length fed to the model.
    pub max_length: usize,
    /// Wall-clock timeout for one renderer subprocess invocation.
    pub process_timeout_ms: u64,
    /// Timeout for the direct-fetch fallback request.
    pub request_timeout_ms: u64,
    /// Hard cap on extracted text length, in characters.
    pub max_chars: usize,
    /// Minimum acceptable text length; shorter text triggers escalation.
    pub min_text_len: usize,
    /// When true, empty extracted text classifies as insufficient data
    /// instead of running the model.
    pub strict_empty_text: bool,
    /// When true, API responses include the padded token sequence.
    pub return_tokens: bool,
    /// When true, a detected block terminates the attempt without trying
    /// the direct-fetch fallback.
    pub block_skips_fallback: bool,
    /// User-agent header for the fallback fetch.
    pub user_agent: String,
    /// Directory the renderer persists debug HTML into. Defaults to a
    /// `debug/` directory next to the renderer script.
    pub debug_html_dir: Option<PathBuf>,
    /// Audit trail location. Defaults to `~/.defacewatch/audit.jsonl`.
    pub audit_log: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            renderer_script: PathBuf::from("tools/renderer/render_page.js"),
            node_binary: None,
            model_path: PathBuf::from("artifacts/model.json"),
            tokenizer_path: PathBuf::from("artifacts/tokenizer.json"),
            max_length: 128,
            process_timeout_ms: 15_000,
            request_timeout_ms: 6_000,
            max_chars: 20_000,
            min_text_len: 200,
            strict_empty_text: false,
            return_tokens: false,
            block_skips_fallback: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            debug_html_dir: None,
            audit_log: None,
        }
    }
}

impl Settings {
    /// Load settings from the environment, falling back to defaults.
    pub fn from_env() -> WatchResult<Self> {
        let defaults = Settings::default();
        Ok(Self {
            renderer_script: env_path("DEFACEWATCH_RENDERER_SCRIPT")
                .unwrap_or(defaults.renderer_script),
            node_binary: env_path("DEFACEWATCH_NODE_BIN"),
            model_path: env_path("DEFACEWATCH_MODEL_PATH").unwrap_or(defaults.model_path),
            tokenizer_path: env_path("DEFACEWATCH_TOKENIZER_PATH")
                .unwrap_or(defaults.tokenizer_path),
            max_length: env_parse("DEFACEWATCH_MAX_LENGTH", defaults.max_length)?,
            process_timeout_ms: env_parse(
                "DEFACEWATCH_PROCESS_TIMEOUT_MS",
                defaults.process_timeout_ms,
            )?,
            request_timeout_ms: env_parse(
                "DEFACEWATCH_REQUEST_TIMEOUT_MS",
                defaults.request_timeout_ms,
            )?,
            max_chars: env_parse("DEFACEWATCH_MAX_CHARS", defaults.max_chars)?,
            min_text_len: env_parse("DEFACEWATCH_MIN_TEXT_LEN", defaults.min_text_len)?,
            strict_empty_text: env_bool("DEFACEWATCH_STRICT_EMPTY_TEXT", false),
            return_tokens: env_bool("DEFACEWATCH_RETURN_TOKENS", false),
            block_skips_fallback: env_bool("DEFACEWATCH_BLOCK_SKIPS_FALLBACK", true),
            user_agent: std::env::var("DEFACEWATCH_USER_AGENT")
                .unwrap_or(defaults.user_agent),
            debug_html_dir: env_path("DEFACEWATCH_DEBUG_HTML_DIR"),
            audit_log: env_path("DEFACEWATCH_AUDIT_LOG"),
        })
    }

    /// Renderer subprocess timeout.
    pub fn process_timeout(&self) -> Duration {
        Duration::from_millis(self.process_timeout_ms)
    }

    /// Direct-fetch timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Directory the renderer writes debug HTML into.
    pub fn debug_dir(&self) -> PathBuf {
        if let Some(dir) = &self.debug_html_dir {
            return dir.clone();
        }
        self.renderer_script
            .parent()
            .map(|p| p.join("debug"))
            .unwrap_or_else(|| PathBuf::from("debug"))
    }

    /// Default audit trail location.
    pub fn audit_path(&self) -> PathBuf {
        if let Some(path) = &self.audit_log {
            return path.clone();
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".defacewatch")
            .join("audit.jsonl")
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty()).map(PathBuf::from)
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> WatchResult<T> {
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| WatchError::Config(format!("{name} is not a valid number: {v}"))),
        Err(_) => Ok(default),
    }
}
