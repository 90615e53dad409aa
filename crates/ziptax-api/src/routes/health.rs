//! # Health Probes
//!
//! Kubernetes-style liveness/readiness split. Liveness answers whenever the
//! process runs; readiness pings the concrete backends. A failing store
//! makes the service not-ready; a failing cache is reported but non-fatal —
//! the engine serves correct (uncached) answers without it.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Readiness report.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessReport {
    /// Overall status: "ready" or "not_ready".
    pub status: String,
    /// Store probe outcome.
    pub database: String,
    /// Cache probe outcome.
    pub cache: String,
    /// When the jurisdiction data set was last refreshed, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_as_of: Option<String>,
}

/// Construct the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
}

/// GET /health/liveness — always 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// GET /health/readiness — 200 when the store answers, 503 otherwise.
async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessReport>) {
    let mut ready = true;
    let mut data_as_of = None;

    let database = match &state.store {
        Some(store) => match store.ping().await {
            Ok(()) => {
                data_as_of = store
                    .data_freshness()
                    .await
                    .ok()
                    .flatten()
                    .map(|ts| ts.to_rfc3339());
                "ok".to_string()
            }
            Err(err) => {
                ready = false;
                format!("error: {err}")
            }
        },
        None => "not configured".to_string(),
    };

    let cache = match &state.cache {
        Some(cache) => match cache.ping().await {
            Ok(()) => "ok".to_string(),
            // Degraded but still ready: lookups recompute without the cache.
            Err(err) => format!("error: {err}"),
        },
        None => "disabled".to_string(),
    };

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let report = ReadinessReport {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        database,
        cache,
        data_as_of,
    };
    (status_code, Json(report))
}
