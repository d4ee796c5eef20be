//! Subprocess invoker for the node renderer script.
//!
//! Runs `node <script> --json <url>` with a hard wall-clock timeout and
//! folds every failure mode into a `RenderAttempt`. The child is killed if
//! the timeout fires. Output parsing tolerates the pre-JSON renderer
//! convention where the script wrote bare text to stdout.

use super::{PageRenderer, RenderAttempt, RenderMethod, RenderOptions};
use crate::config::Settings;
use crate::error::ErrorTag;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

const MAX_STDERR_LINE: usize = 200;

/// Stdout payload of the renderer script in `--json` mode.
#[derive(Debug, Deserialize)]
struct RendererPayload {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    text_len: Option<usize>,
    #[serde(default)]
    http_status: Option<u16>,
    #[serde(default)]
    final_url: Option<String>,
    #[serde(default)]
    method: Option<RenderMethod>,
    #[serde(default)]
    timings: BTreeMap<String, f64>,
    #[serde(default)]
    errors: Vec<String>,
}

/// Drives the external node renderer.
pub struct NodeRenderer {
    script: PathBuf,
    node_override: Option<PathBuf>,
    timeout: Duration,
    min_text_len: usize,
}

impl NodeRenderer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            script: settings.renderer_script.clone(),
            node_override: settings.node_binary.clone(),
            timeout: settings.process_timeout(),
            min_text_len: settings.min_text_len,
        }
    }

    fn resolve_runtime(&self) -> Option<PathBuf> {
        if let Some(bin) = &self.node_override {
            if bin.exists() {
                return Some(bin.clone());
            }
            warn!("configured node binary {} not found, falling back to PATH", bin.display());
        }
        which::which("node").ok()
    }
}

#[async_trait]
impl PageRenderer for NodeRenderer {
    async fn render(&self, url: &str, opts: RenderOptions) -> RenderAttempt {
        let Some(runtime) = self.resolve_runtime() else {
            return RenderAttempt::failure(ErrorTag::RuntimeNotFound);
        };

        let mut cmd = Command::new(&runtime);
        cmd.arg(&self.script)
            .arg("--json")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if opts.persist_html {
            cmd.env("SAVE_HTML", "1");
            cmd.env("MIN_TEXT_LEN", self.min_text_len.to_string());
        }

        debug!("renderer: {} {} --json {}", runtime.display(), self.script.display(), url);
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return RenderAttempt::failure(ErrorTag::RuntimeNotFound);
            }
            Ok(Err(e)) => {
                return RenderAttempt::failure_with_detail(ErrorTag::RenderError, e.to_string());
            }
            Err(_) => {
                warn!("renderer timed out after {:?} for {url}", self.timeout);
                return RenderAttempt::failure(ErrorTag::RenderTimeout);
            }
        };

        parse_streams(url, output.status.success(), &output.stdout, &output.stderr)
    }
}

/// Interpret one finished invocation. Pure so it can be tested without
/// spawning processes.
fn parse_streams(url: &str, exited_ok: bool, stdout: &[u8], stderr: &[u8]) -> RenderAttempt {
    if !exited_ok {
        let stderr = String::from_utf8_lossy(stderr);
        let first_line: String = stderr
            .trim()
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(MAX_STDERR_LINE)
            .collect();
        return if first_line.is_empty() {
            RenderAttempt::failure(ErrorTag::RenderFailed)
        } else {
            RenderAttempt::failure_with_detail(ErrorTag::RenderFailed, first_line)
        };
    }

    let raw = String::from_utf8_lossy(stdout);
    let raw = raw.trim();
    if raw.is_empty() {
        return RenderAttempt::failure(ErrorTag::RenderEmpty);
    }

    let payload: RendererPayload = match serde_json::from_str(raw) {
        Ok(payload) => payload,
        Err(_) => {
            // Pre-JSON renderer convention: stdout is the text itself.
            return RenderAttempt {
                ok: true,
                text: Some(raw.to_string()),
                text_len: raw.chars().count(),
                final_url: Some(url.to_string()),
                http_status: None,
                method: RenderMethod::LegacyStdout,
                timings: BTreeMap::new(),
                errors: Vec::new(),
            };
        }
    };

    let final_url = payload
        .final_url
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| url.to_string());
    let method = payload.method.unwrap_or(RenderMethod::Fallback);

    if !payload.ok {
        return RenderAttempt {
            ok: false,
            text: None,
            text_len: 0,
            final_url: Some(final_url),
            http_status: payload.http_status,
            method,
            timings: payload.timings,
            errors: payload.errors,
        };
    }

    let text = payload.text.unwrap_or_default();
    let text_len = payload.text_len.unwrap_or_else(|| text.chars().count());
    RenderAttempt {
        ok: true,
        text: Some(text),
        text_len,
        final_url: Some(final_url),
        http_status: payload.http_status,
        method,
        timings: payload.timings,
        errors: payload.errors,
    }
}
