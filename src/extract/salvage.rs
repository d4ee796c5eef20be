//! JSON-LD salvage path.
//!
//! When a render succeeds but yields too little plain text, the renderer is
//! invoked once more with HTML persistence requested, and the saved page is
//! mined for JSON-LD text. The saved file is located by recency: the
//! renderer names files by host and timestamp, and only files written since
//! the salvage attempt started (with a small tolerance for clock skew) are
//! considered.

use crate::acquisition::extract_jsonld_text;
use crate::renderer::{PageRenderer, RenderOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;
use url::Url;

/// Tolerance subtracted from the attempt start when filtering by mtime.
const MTIME_SLACK: Duration = Duration::from_secs(2);

/// Re-render with persistence and mine the saved HTML for JSON-LD text.
/// Returns `None` when nothing was salvaged.
pub async fn recover_jsonld_text(
    renderer: &dyn PageRenderer,
    debug_dir: &Path,
    url: &str,
) -> Option<String> {
    let start = SystemTime::now();
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();

    let attempt = renderer.render(url, RenderOptions { persist_html: true }).await;
    if !attempt.ok {
        // The file may still have been written before the failure, so the
        // read below happens regardless.
        debug!("salvage re-render reported errors: {:?}", attempt.errors);
    }

    let html = read_latest_debug_html(debug_dir, &host, start)?;
    let text = extract_jsonld_text(&html);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Newest debug HTML written at or after `start` minus the skew tolerance.
/// Files whose name starts with the host are preferred over other recent
/// captures, which matters when concurrent extractions share the directory.
pub fn read_latest_debug_html(debug_dir: &Path, host: &str, start: SystemTime) -> Option<String> {
    let cutoff = start
        .checked_sub(MTIME_SLACK)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let entries = std::fs::read_dir(debug_dir).ok()?;
    let mut recent: Vec<(SystemTime, PathBuf, bool)> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".html") {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        let Ok(mtime) = meta.modified() else {
            continue;
        };
        if mtime < cutoff {
            continue;
        }
        let host_match = !host.is_empty() && name.starts_with(&format!("{host}_"));
        recent.push((mtime, path, host_match));
    }

    if recent.iter().any(|(_, _, host_match)| *host_match) {
        recent.retain(|(_, _, host_match)| *host_match);
    }

    let (_, path, _) = recent.into_iter().max_by_key(|(mtime, _, _)| *mtime)?;
    let bytes = std::fs::read(&path).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}
