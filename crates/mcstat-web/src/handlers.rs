//! HTTP request handlers: metrics exposition and health.

use std::sync::PoisonError;
use std::time::Instant;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, info};

use mcstat_core::exposition;

use crate::state::AppState;

// ============================================================
// Health
// ============================================================

pub(crate) async fn handle_health() -> &'static str {
    "ok"
}

// ============================================================
// Metrics
// ============================================================

/// Runs one collection cycle and renders it.
///
/// The cycle blocks on file and socket I/O, so it runs off the async
/// runtime. The state lock serializes concurrent scrapes.
pub(crate) async fn handle_metrics(State(state): AppState) -> Response {
    let t0 = Instant::now();
    let result = tokio::task::spawn_blocking(move || {
        let mut inner = state.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = inner.collector.collect_snapshot();
        inner.scrapes += 1;
        let scrapes = inner.scrapes;
        exposition::render(&snapshot).map(|body| (body, snapshot.samples.len(), scrapes))
    })
    .await;

    let elapsed = t0.elapsed();

    match result {
        Ok(Ok((body, samples, scrapes))) => {
            if scrapes == 1 {
                info!(
                    duration_ms = elapsed.as_millis() as u64,
                    samples, "first scrape served"
                );
            } else {
                debug!(
                    duration_ms = elapsed.as_millis() as u64,
                    samples, scrapes, "scrape served"
                );
            }
            ([(header::CONTENT_TYPE, exposition::CONTENT_TYPE)], body).into_response()
        }
        Ok(Err(e)) => {
            error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            error!(error = %e, "collection panicked in spawn_blocking");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
