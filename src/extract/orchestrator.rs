//! Extraction sequencing and the final decision matrix.
//!
//! One `extract` call walks: render attempt, block check, quality gate,
//! JSON-LD salvage, direct-fetch fallback. Weak render text is held onto
//! through the fallback stage because even a short rendered page outranks a
//! weak or failed fetch. Diagnostics accumulate across every stage so the
//! caller always sees what was tried.

use super::quality::{self, TextQuality};
use super::salvage;
use super::{block, Assessment, Diagnostics, ExtractionOutcome, FetchDiagnostics, RenderDiagnostics};
use crate::acquisition::HttpFetcher;
use crate::config::Settings;
use crate::error::ErrorTag;
use crate::renderer::{PageRenderer, RenderMethod, RenderOptions};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Shown when short text is returned with no better alternative.
const SHORT_TEXT_WARNING: &str = "Extracted text is very short; the page may be text-poor, \
     consent-gated, or iframe-based. Prediction confidence may be reduced.";

/// Shown when weak render text is preferred over a weak or failed fetch.
const RENDER_PREFERRED_WARNING: &str = "Extracted text is short; the page may be blocked or \
     rely on iframes or challenges.";

/// Weak render text carried into the fallback stage.
struct KeptRender {
    text: String,
    truncated: bool,
    method: RenderMethod,
    scrape_ms: u64,
}

/// Sequences render, salvage, and fallback for one URL at a time.
pub struct ExtractionOrchestrator {
    renderer: Arc<dyn PageRenderer>,
    fetcher: HttpFetcher,
    settings: Arc<Settings>,
}

impl ExtractionOrchestrator {
    pub fn new(renderer: Arc<dyn PageRenderer>, fetcher: HttpFetcher, settings: Arc<Settings>) -> Self {
        Self { renderer, fetcher, settings }
    }

    /// Run the full pipeline. Never returns an error: hard failures come
    /// back as an outcome with `text: None` and a typed error tag.
    pub async fn extract(&self, url: &str) -> ExtractionOutcome {
        let min_len = self.settings.min_text_len;
        let max_chars = self.settings.max_chars;

        let render_started = Instant::now();
        let attempt = self.renderer.render(url, RenderOptions::default()).await;
        let render_wall_ms = render_started.elapsed().as_millis() as u64;

        let sanitized = quality::sanitize_errors(&attempt.errors);
        let blocked = block::is_blocked(attempt.http_status, &sanitized);
        let final_url = attempt.final_url.clone().unwrap_or_else(|| url.to_string());

        let mut render_diag = RenderDiagnostics {
            ok: attempt.ok,
            http_status: attempt.http_status,
            final_url: final_url.clone(),
            method: attempt.method,
            text_len: attempt.text_len,
            timings: attempt.timings.clone(),
            errors: sanitized,
            blocked,
            method_override: None,
            assessment: Assessment::None,
        };
        info!(
            "render meta url={url} final={final_url} status={:?} method={} timings={:?}",
            attempt.http_status, attempt.method, attempt.timings
        );

        // Renderer-reported duration beats our wall clock when available.
        let render_scrape_ms = attempt
            .total_ms()
            .map(|ms| ms.round() as u64)
            .unwrap_or(render_wall_ms);

        if blocked {
            render_diag.assessment = Assessment::Blocked;
            if self.settings.block_skips_fallback {
                info!("{url} judged blocked (status={:?}), skipping fallback", attempt.http_status);
                return ExtractionOutcome {
                    text: None,
                    source: "render".into(),
                    scrape_time_ms: render_wall_ms,
                    truncated: false,
                    error: Some(ErrorTag::Blocked),
                    diagnostics: Diagnostics {
                        render: Some(render_diag),
                        direct_fetch: FetchDiagnostics::default(),
                    },
                    warning: None,
                };
            }
            // Loose policy: the block may be a false positive, so try the
            // direct fetch. Render text stays untrusted and salvage is
            // pointless against a challenge page.
            warn!("{url} judged blocked, trying direct fetch anyway");
            return self
                .fallback(url, None, render_diag, Some(ErrorTag::Blocked))
                .await;
        }

        let render_text = attempt.text.as_deref().unwrap_or("");
        let mut kept: Option<KeptRender> = None;

        if attempt.ok && !render_text.is_empty() {
            let normalized = quality::normalize(render_text, max_chars, false);
            let length = normalized.text.chars().count();
            if quality::assess(length, min_len) == TextQuality::Accepted {
                return ExtractionOutcome {
                    text: Some(normalized.text),
                    source: format!("render({})", attempt.method.as_str()),
                    scrape_time_ms: render_scrape_ms,
                    truncated: normalized.truncated,
                    error: None,
                    diagnostics: Diagnostics {
                        render: Some(render_diag),
                        direct_fetch: FetchDiagnostics::default(),
                    },
                    warning: None,
                };
            }

            render_diag.assessment = if attempt.method.is_weak_dom_path() {
                Assessment::WeakExtraction
            } else {
                Assessment::LowText
            };

            // Weak text: the page may carry its content in JSON-LD even
            // when the DOM walk came up short.
            if let Some(salvaged) = salvage::recover_jsonld_text(
                self.renderer.as_ref(),
                &self.settings.debug_dir(),
                &final_url,
            )
            .await
            {
                let normalized = quality::normalize(&salvaged, max_chars, true);
                if quality::assess(normalized.text.chars().count(), min_len)
                    == TextQuality::Accepted
                {
                    info!("{url} salvaged {} chars from JSON-LD", normalized.text.chars().count());
                    render_diag.method_override = Some(RenderMethod::JsonLd);
                    return ExtractionOutcome {
                        text: Some(normalized.text),
                        source: "render(jsonld)".into(),
                        scrape_time_ms: render_scrape_ms,
                        truncated: normalized.truncated,
                        error: None,
                        diagnostics: Diagnostics {
                            render: Some(render_diag),
                            direct_fetch: FetchDiagnostics::default(),
                        },
                        warning: None,
                    };
                }
            }

            kept = Some(KeptRender {
                text: normalized.text,
                truncated: normalized.truncated,
                method: attempt.method,
                scrape_ms: render_scrape_ms,
            });
        } else {
            warn!("render produced no text for {url}: {:?}", render_diag.errors);
        }

        self.fallback(url, kept, render_diag, None).await
    }

    /// Direct-fetch stage plus the final decision matrix.
    ///
    /// `pending_error` preserves a block verdict across a recovery attempt:
    /// if the fetch also fails, the block is what gets reported.
    async fn fallback(
        &self,
        url: &str,
        kept: Option<KeptRender>,
        mut render_diag: RenderDiagnostics,
        pending_error: Option<ErrorTag>,
    ) -> ExtractionOutcome {
        let min_len = self.settings.min_text_len;
        let max_chars = self.settings.max_chars;

        let fetch = self.fetcher.fetch(url).await;
        let fetch_diag = FetchDiagnostics {
            used: true,
            status_code: fetch.status,
            elapsed_ms: Some(fetch.elapsed_ms),
        };

        let normalized = quality::normalize(fetch.text.as_deref().unwrap_or(""), max_chars, true);
        let length = normalized.text.chars().count();

        if fetch.failure.is_none() && length >= min_len {
            return ExtractionOutcome {
                text: Some(normalized.text),
                source: "direct-fetch".into(),
                scrape_time_ms: fetch.elapsed_ms,
                truncated: normalized.truncated,
                error: None,
                diagnostics: Diagnostics { render: Some(render_diag), direct_fetch: fetch_diag },
                warning: None,
            };
        }

        // A weak render still beats a weak, empty, or failed fetch.
        if let Some(kept) = kept {
            return ExtractionOutcome {
                text: Some(kept.text),
                source: format!("render({})", kept.method.as_str()),
                scrape_time_ms: kept.scrape_ms,
                truncated: kept.truncated,
                error: None,
                diagnostics: Diagnostics { render: Some(render_diag), direct_fetch: fetch_diag },
                warning: Some(RENDER_PREFERRED_WARNING.to_string()),
            };
        }

        if fetch.failure.is_none() && length > 0 {
            // Short but real text, and nothing better to offer.
            if render_diag.assessment == Assessment::None {
                render_diag.assessment = Assessment::LowText;
            }
            return ExtractionOutcome {
                text: Some(normalized.text),
                source: "direct-fetch".into(),
                scrape_time_ms: fetch.elapsed_ms,
                truncated: normalized.truncated,
                error: None,
                diagnostics: Diagnostics { render: Some(render_diag), direct_fetch: fetch_diag },
                warning: Some(SHORT_TEXT_WARNING.to_string()),
            };
        }

        let fetch_error = match &fetch.failure {
            Some(failure) => failure.tag(),
            None => ErrorTag::RequestsEmpty,
        };
        let error = pending_error.unwrap_or(fetch_error);
        warn!("extraction failed for {url}: {error}");
        ExtractionOutcome {
            text: None,
            source: "direct-fetch".into(),
            scrape_time_ms: fetch.elapsed_ms,
            truncated: false,
            error: Some(error),
            diagnostics: Diagnostics { render: Some(render_diag), direct_fetch: fetch_diag },
            warning: None,
        }
    }
}
