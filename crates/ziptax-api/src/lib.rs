//! # ziptax-api — Axum API Surface
//!
//! The transport layer above the resolution engine. Assembles the tax
//! lookup routes, health probes, Prometheus metrics, and the OpenAPI spec
//! into a single application.
//!
//! ## API Surface
//!
//! | Route                       | Module             | Behavior             |
//! |-----------------------------|--------------------|----------------------|
//! | `GET /v1/tax/zip/{zip}`     | [`routes::tax`]    | Cache-aside lookup   |
//! | `GET /v1/tax/address`       | [`routes::tax`]    | Always-fresh lookup  |
//! | `POST /v1/tax/calculate`    | [`routes::tax`]    | Tax owed + total     |
//! | `POST /v1/tax/bulk`         | [`routes::tax`]    | Per-item fan-out     |
//! | `GET /health/liveness`      | [`routes::health`] | Static probe         |
//! | `GET /health/readiness`     | [`routes::health`] | Backend pings        |
//! | `GET /metrics`              | here               | Prometheus render    |
//! | `GET /openapi.json`         | [`openapi`]        | Generated spec       |
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers — everything delegates to
//!   `ziptax-engine`.
//! - All errors map to structured HTTP responses via [`AppError`].
//! - The caller is treated as already authenticated; auth lives upstream.

pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes are mounted outside the metrics middleware so probe
/// traffic does not pollute request counters.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::tax::router())
        .merge(openapi::router())
        .route("/metrics", get(render_metrics))
        .layer(from_fn(middleware::track_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let health = routes::health::router().with_state(state);

    Router::new().merge(health).merge(api)
}

/// GET /metrics — Prometheus exposition, 404 when no recorder is installed.
async fn render_metrics(State(state): State<AppState>) -> Result<String, AppError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| AppError::NotFound("metrics recorder not installed".to_string()))
}
