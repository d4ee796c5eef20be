//! Environment readiness check.

use crate::classifier::model::ScoringModel;
use crate::classifier::tokenizer::TextTokenizer;
use crate::config::Settings;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Check node runtime, renderer script, classifier artifacts, and the
/// debug HTML directory.
pub async fn run() -> Result<()> {
    println!("Defacewatch Doctor");
    println!("==================");
    println!();

    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    let settings = Settings::from_env()?;
    let mut ready = true;

    // Node runtime
    let node = find_node(&settings);
    match &node {
        Some(path) => {
            let version = node_version(path).unwrap_or_else(|| "unknown version".to_string());
            println!("[OK] node runtime: {} ({version})", path.display());
        }
        None => {
            ready = false;
            println!("[!!] node NOT found. Install Node.js or set DEFACEWATCH_NODE_BIN.");
        }
    }

    // Renderer script
    if settings.renderer_script.exists() {
        println!("[OK] renderer script: {}", settings.renderer_script.display());
    } else {
        ready = false;
        println!(
            "[!!] renderer script missing: {}",
            settings.renderer_script.display()
        );
    }

    // Classifier artifacts
    match load_artifacts(&settings) {
        Ok((vocab, threshold)) => {
            println!("[OK] classifier artifacts: {vocab} vocabulary entries, threshold {threshold}");
        }
        Err(e) => {
            ready = false;
            println!("[!!] classifier artifacts: {e:#}");
        }
    }

    // Debug HTML directory
    let debug_dir = settings.debug_dir();
    match probe_writable(&debug_dir) {
        Ok(()) => println!("[OK] debug directory writable: {}", debug_dir.display()),
        Err(e) => {
            // Salvage degrades without it but the service still runs.
            println!("[??] debug directory not writable ({}): {e}", debug_dir.display());
        }
    }

    println!();
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}

/// Find the node binary: explicit override first, then PATH.
fn find_node(settings: &Settings) -> Option<PathBuf> {
    if let Some(bin) = &settings.node_binary {
        if bin.exists() {
            return Some(bin.clone());
        }
    }
    which::which("node").ok()
}

fn node_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let v = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

/// Parse both artifacts, returning vocabulary size and decision threshold.
fn load_artifacts(settings: &Settings) -> Result<(usize, f64)> {
    let raw = std::fs::read_to_string(&settings.tokenizer_path)
        .map_err(|e| anyhow::anyhow!("{} unreadable: {e}", settings.tokenizer_path.display()))?;
    let tokenizer = TextTokenizer::from_json(&raw)?;

    let raw = std::fs::read_to_string(&settings.model_path)
        .map_err(|e| anyhow::anyhow!("{} unreadable: {e}", settings.model_path.display()))?;
    let model = ScoringModel::from_json(&raw)?;

    Ok((tokenizer.vocab_len(), model.threshold))
}

/// Confirm we can create and write inside the directory.
fn probe_writable(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let probe = dir.join(".doctor_probe");
    std::fs::write(&probe, b"ok")?;
    std::fs::remove_file(&probe)
}
