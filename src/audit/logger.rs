//! JSONL audit logger: append-only record of every check.
//!
//! Features:
//! - Append-only JSONL format for easy parsing
//! - Automatic log rotation when file exceeds `MAX_LOG_SIZE` (100MB)
//! - Rotated files named `.1`, `.2`, etc. (max 5 rotations)

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Maximum audit log size before rotation (100 MB).
const MAX_LOG_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum number of rotated log files to keep.
const MAX_ROTATIONS: u32 = 5;

/// A single audited check.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub request_id: String,
    pub url: String,
    /// Extraction source label, e.g. "render(dom)" or "direct-fetch".
    pub source: String,
    pub verdict: Option<String>,
    pub probability: Option<f64>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Append-only JSONL audit logger with automatic rotation.
pub struct AuditLogger {
    file: File,
    path: PathBuf,
    /// Approximate current size (may drift slightly; re-checked on rotation).
    current_size: u64,
}

impl AuditLogger {
    /// Open or create the audit log file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open audit log: {}", path.display()))?;

        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            current_size,
        })
    }

    /// Log an audit event.
    pub fn log(&mut self, event: &AuditEvent) -> Result<()> {
        // Check if rotation is needed before writing
        if self.current_size >= MAX_LOG_SIZE {
            self.rotate()?;
        }

        let json = serde_json::to_string(event)?;
        let bytes_written = writeln!(self.file, "{json}")
            .map(|()| json.len() as u64 + 1)
            .unwrap_or(0);
        self.current_size += bytes_written;
        Ok(())
    }

    /// Log one completed check with timing.
    #[allow(clippy::too_many_arguments)]
    pub fn log_check(
        &mut self,
        request_id: &str,
        url: &str,
        source: &str,
        verdict: Option<&str>,
        probability: Option<f64>,
        error: Option<&str>,
        duration_ms: u64,
    ) -> Result<()> {
        self.log(&AuditEvent {
            timestamp: Utc::now().to_rfc3339(),
            request_id: request_id.to_string(),
            url: url.to_string(),
            source: source.to_string(),
            verdict: verdict.map(String::from),
            probability,
            error: error.map(String::from),
            duration_ms,
        })
    }

    /// Rotate log files: audit.jsonl → audit.jsonl.1, .1 → .2, etc.
    fn rotate(&mut self) -> Result<()> {
        self.file.flush()?;

        // Shift existing rotated files
        for i in (1..MAX_ROTATIONS).rev() {
            let from = rotation_path(&self.path, i);
            let to = rotation_path(&self.path, i + 1);
            if from.exists() {
                let _ = std::fs::rename(&from, &to);
            }
        }

        // Rename current → .1
        let first_rotation = rotation_path(&self.path, 1);
        let _ = std::fs::rename(&self.path, &first_rotation);

        // Delete oldest if over limit
        let oldest = rotation_path(&self.path, MAX_ROTATIONS);
        if oldest.exists() {
            let _ = std::fs::remove_file(&oldest);
        }

        // Reopen fresh log
        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| "failed to reopen audit log after rotation")?;
        self.current_size = 0;

        Ok(())
    }
}

/// Build path for a rotated log file: `audit.jsonl.1`, `audit.jsonl.2`, etc.
fn rotation_path(base: &Path, index: u32) -> PathBuf {
    let name = format!(
        "{}.{index}",
        base.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audit.jsonl")
    );
    base.with_file_name(name)
}
