//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor.
//!
//! The resolution engine is held as an injected [`TaxService`]; the concrete
//! Postgres and Redis handles are carried separately — and optionally — so
//! the readiness probe can ping them without the engine knowing they exist.
//! Contract tests build an `AppState` from fake collaborators and leave both
//! probe handles empty.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use ziptax_cache::RedisCache;
use ziptax_engine::TaxService;
use ziptax_store::PgTaxStore;

/// Shared application state. Cloned per request; all members are cheap
/// handles.
#[derive(Clone)]
pub struct AppState {
    /// The resolution engine.
    pub service: Arc<TaxService>,
    /// Postgres handle for the readiness probe, absent under test fakes.
    pub store: Option<PgTaxStore>,
    /// Redis handle for the readiness probe, absent when caching is disabled.
    pub cache: Option<RedisCache>,
    /// Prometheus render handle, absent when no recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create state around a resolution service, with no probe handles and
    /// no metrics recorder.
    pub fn new(service: Arc<TaxService>) -> Self {
        Self {
            service,
            store: None,
            cache: None,
            metrics: None,
        }
    }

    /// Attach the concrete backend handles used by the readiness probe.
    pub fn with_probes(mut self, store: Option<PgTaxStore>, cache: Option<RedisCache>) -> Self {
        self.store = store;
        self.cache = cache;
        self
    }

    /// Attach the Prometheus render handle served at `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
