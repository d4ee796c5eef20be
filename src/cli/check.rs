//! One-shot check: extract a page and classify it from the command line.

use crate::config::Settings;
use crate::rest::{normalize_url, ApiState};
use crate::server;
use anyhow::{bail, Result};
use serde_json::json;
use std::time::Instant;

pub async fn run(url: &str, json_output: bool) -> Result<()> {
    let settings = Settings::from_env()?;
    let state = server::build_state(settings).await;

    let Some(checked_url) = normalize_url(url) else {
        bail!("no URL given");
    };
    if url::Url::parse(&checked_url).is_err() {
        bail!("'{url}' is not a valid URL");
    }

    let request_id = uuid::Uuid::new_v4().to_string();
    let started = Instant::now();
    let outcome = state.orchestrator.extract(&checked_url).await;

    let Some(text) = outcome.text.clone() else {
        let tag = outcome
            .error
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        audit(
            &state,
            &request_id,
            &checked_url,
            &outcome.source,
            None,
            None,
            Some(&tag),
            started.elapsed().as_millis() as u64,
        )
        .await;
        if json_output {
            let body = json!({
                "checked_url": checked_url,
                "source": outcome.source,
                "scrape_time_ms": outcome.scrape_time_ms,
                "scrape_error": tag,
                "extraction": outcome.diagnostics,
                "request_id": request_id,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        } else {
            eprintln!("  Check failed for {checked_url}");
            eprintln!("    source: {}  error: {tag}", outcome.source);
        }
        bail!("could not extract text from {checked_url}");
    };

    let prediction = state.predictor.predict(&text).await?;
    let total_ms = started.elapsed().as_millis() as u64;
    audit(
        &state,
        &request_id,
        &checked_url,
        &outcome.source,
        Some(prediction.verdict.as_str()),
        Some(prediction.probability),
        None,
        total_ms,
    )
    .await;

    if json_output {
        let mut body = json!({
            "status": prediction.verdict,
            "probability": prediction.probability,
            "checked_url": checked_url,
            "source": outcome.source,
            "extracted_text_truncated": outcome.truncated,
            "scrape_time_ms": outcome.scrape_time_ms,
            "predict_time_ms": prediction.predict_time_ms,
            "total_time_ms": total_ms,
            "extraction": outcome.diagnostics,
            "request_id": request_id,
        });
        if let Some(warning) = &outcome.warning {
            body["source_warning"] = json!(warning);
        }
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("  URL:          {checked_url}");
    println!(
        "  Verdict:      {} (p = {:.4})",
        prediction.verdict.as_str().to_uppercase(),
        prediction.probability
    );
    println!("  Source:       {}", outcome.source);
    println!(
        "  Text length:  {} chars{}",
        text.chars().count(),
        if outcome.truncated { " (truncated)" } else { "" }
    );
    println!("  Scrape time:  {} ms", outcome.scrape_time_ms);
    println!("  Predict time: {} ms", prediction.predict_time_ms);
    if let Some(warning) = &outcome.warning {
        println!("  Warning:      {warning}");
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn audit(
    state: &ApiState,
    request_id: &str,
    url: &str,
    source: &str,
    verdict: Option<&str>,
    probability: Option<f64>,
    error: Option<&str>,
    duration_ms: u64,
) {
    if let Some(logger) = &state.audit {
        let mut logger = logger.lock().await;
        if let Err(e) =
            logger.log_check(request_id, url, source, verdict, probability, error, duration_ms)
        {
            tracing::warn!("audit write failed: {e}");
        }
    }
}
