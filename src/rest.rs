// Copyright 2026 DefaceWatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API.
//!
//! One inbound endpoint drives the whole pipeline: POST `/api/v1/predict`
//! takes `{url}`, runs extraction, feeds the text to the classifier, and
//! returns the verdict with full extraction diagnostics. Every response
//! carries a request id for log correlation.

use crate::audit::AuditLogger;
use crate::classifier::DefacePredictor;
use crate::config::Settings;
use crate::extract::ExtractionOrchestrator;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Shared state behind every handler.
pub struct ApiState {
    pub settings: Arc<Settings>,
    pub orchestrator: ExtractionOrchestrator,
    pub predictor: DefacePredictor,
    pub audit: Option<Arc<tokio::sync::Mutex<AuditLogger>>>,
    pub started_at: Instant,
}

/// Build the axum Router with all REST endpoints.
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/predict", post(handle_predict))
        .layer(cors)
        .with_state(state)
}

// ── Helpers ─────────────────────────────────────────────────────

/// Trim and scheme-normalize a user-supplied URL. Bare hostnames get
/// `http://` prepended; blank input yields `None`.
pub(crate) fn normalize_url(value: &str) -> Option<String> {
    let url = value.trim();
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Some(url.to_string())
    } else {
        Some(format!("http://{url}"))
    }
}

fn error_body(message: &str, request_id: &str) -> Json<Value> {
    Json(serde_json::json!({ "error": message, "request_id": request_id }))
}

// ── Handlers ────────────────────────────────────────────────────

async fn health(State(state): State<Arc<ApiState>>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.predictor.ready(),
        "uptime_seconds": state.started_at.elapsed().as_secs_f64(),
    }))
}

/// Query parameters for `/api/v1/predict`.
#[derive(serde::Deserialize, Default)]
struct PredictParams {
    debug: Option<String>,
}

async fn handle_predict(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<PredictParams>,
    body: Option<Json<Value>>,
) -> (StatusCode, Json<Value>) {
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);
    let Some(url) = body.get("url").and_then(|v| v.as_str()).and_then(normalize_url) else {
        return (
            StatusCode::BAD_REQUEST,
            error_body("Invalid JSON body or missing URL.", &request_id),
        );
    };
    if url::Url::parse(&url).is_err() {
        return (
            StatusCode::BAD_REQUEST,
            error_body("The provided URL is not valid.", &request_id),
        );
    }

    let outcome = state.orchestrator.extract(&url).await;

    let Some(text) = outcome.text.clone() else {
        let tag = outcome.error.map(|e| e.as_str());
        let message = if tag == Some("blocked") {
            "The site runs anti-bot protection or requires verification; content could not be extracted."
        } else {
            "Could not scrape data from this URL (blocked, timeout, or error)."
        };
        audit(
            &state,
            &request_id,
            &url,
            &outcome.source,
            None,
            None,
            tag,
            started.elapsed().as_millis() as u64,
        )
        .await;
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": message,
                "request_id": request_id,
                "checked_url": url,
                "source": outcome.source,
                "scrape_time_ms": outcome.scrape_time_ms,
                "scrape_error": tag,
                "extraction": outcome.diagnostics,
            })),
        );
    };

    let prediction = match state.predictor.predict(&text).await {
        Ok(prediction) => prediction,
        Err(e) => {
            error!("classifier failure request_id={request_id} url={url}: {e}");
            audit(
                &state,
                &request_id,
                &url,
                &outcome.source,
                None,
                None,
                Some("classifier_error"),
                started.elapsed().as_millis() as u64,
            )
            .await;
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Unexpected server error.", &request_id),
            );
        }
    };

    let total_time_ms = started.elapsed().as_millis() as u64;
    let include_tokens = state.settings.return_tokens || params.debug.as_deref() == Some("1");
    let text_response = if text.is_empty() { "(no text found)".to_string() } else { text };

    info!(
        "predict request_id={request_id} url={url} source={} scrape_ms={} predict_ms={} status={} prob={:.4}",
        outcome.source,
        outcome.scrape_time_ms,
        prediction.predict_time_ms,
        prediction.verdict.as_str(),
        prediction.probability
    );
    audit(
        &state,
        &request_id,
        &url,
        &outcome.source,
        Some(prediction.verdict.as_str()),
        Some(prediction.probability),
        None,
        total_time_ms,
    )
    .await;

    let mut response = serde_json::json!({
        "status": prediction.verdict,
        "probability": prediction.probability,
        "extracted_text": text_response,
        "extracted_text_truncated": outcome.truncated,
        "tokenized_sequence": if include_tokens { Some(&prediction.tokens) } else { None },
        "tokenized_sequence_included": include_tokens,
        "checked_url": url,
        "source": outcome.source,
        "scrape_time_ms": outcome.scrape_time_ms,
        "predict_time_ms": prediction.predict_time_ms,
        "total_time_ms": total_time_ms,
        "request_id": request_id,
        "extraction": outcome.diagnostics,
    });
    if let Some(warning) = outcome.warning {
        response["source_warning"] = Value::String(warning);
    }
    (StatusCode::OK, Json(response))
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
    if let Some(audit) = &state.audit {
        let mut logger = audit.lock().await;
        if let Err(e) = logger.log_check(request_id, url, source, verdict, probability, error, duration_ms)
        {
            warn!("audit write failed: {e}");
        }
    }
}
