//! # Request Metrics Middleware
//!
//! Records per-request counters and latency through the `metrics` facade.
//! The Prometheus recorder (installed by the binary) picks these up and
//! renders them at `GET /metrics`; under tests no recorder is installed and
//! the macros are no-ops.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};

/// Count every request by method, matched route, and status, and record its
/// latency. Uses the matched route template (not the raw URI) so path
/// parameters do not explode label cardinality.
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let latency = start.elapsed();

    let status = response.status().as_u16().to_string();
    counter!(
        "ziptax_http_requests_total",
        "method" => method,
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    histogram!("ziptax_http_request_duration_seconds", "path" => path)
        .record(latency.as_secs_f64());

    response
}
