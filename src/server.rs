//! Service composition and HTTP server lifecycle.
//!
//! Wires the extraction pipeline, classifier, and audit log into an
//! [`ApiState`] and serves the REST API until Ctrl-C.

use crate::acquisition::HttpFetcher;
use crate::audit::AuditLogger;
use crate::classifier::DefacePredictor;
use crate::config::Settings;
use crate::extract::ExtractionOrchestrator;
use crate::renderer::node::NodeRenderer;
use crate::renderer::PageRenderer;
use crate::rest::{self, ApiState};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Build the shared API state from settings.
///
/// Opens the audit log and warms classifier artifacts so the first request
/// does not pay the load cost. A failed warm-up leaves the service running
/// degraded; prediction requests retry the load on demand.
pub async fn build_state(settings: Settings) -> Arc<ApiState> {
    let settings = Arc::new(settings);

    let renderer: Arc<dyn PageRenderer> = Arc::new(NodeRenderer::new(&settings));
    let fetcher = HttpFetcher::new(&settings);
    let orchestrator = ExtractionOrchestrator::new(renderer, fetcher, Arc::clone(&settings));
    let predictor = DefacePredictor::new(&settings);

    if let Err(e) = predictor.warm().await {
        warn!("classifier artifacts unavailable, starting degraded: {e}");
    }

    let audit = match AuditLogger::open(&settings.audit_path()) {
        Ok(logger) => Some(Arc::new(Mutex::new(logger))),
        Err(e) => {
            warn!("audit log disabled: {e}");
            None
        }
    };

    Arc::new(ApiState {
        settings,
        orchestrator,
        predictor,
        audit,
        started_at: Instant::now(),
    })
}

/// Run the REST API until Ctrl-C.
pub async fn run(settings: Settings, host: &str, port: u16) -> Result<()> {
    let state = build_state(settings).await;
    let app = rest::router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("REST API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
        })
        .await
        .context("server error")?;

    Ok(())
}
