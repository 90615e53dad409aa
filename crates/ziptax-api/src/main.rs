//! # ziptax-api — Binary Entry Point
//!
//! Starts the Axum HTTP server: tracing first, then configuration, the
//! Postgres store (required), the Redis cache (optional — absence or a
//! failed connection degrades to uncached operation), the Prometheus
//! recorder, and finally the listener.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;

use ziptax_api::config::Config;
use ziptax_api::state::AppState;
use ziptax_cache::RedisCache;
use ziptax_engine::{NoopCache, ResponseCache, ServiceConfig, TaxService};
use ziptax_store::PgTaxStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().map_err(|err| {
        tracing::error!(error = %err, "failed to load configuration");
        anyhow::anyhow!(err)
    })?;

    // Database (required).
    let store = PgTaxStore::connect(&config.database_url).await.map_err(|err| {
        tracing::error!(error = %err, "failed to connect to database");
        anyhow::anyhow!(err.to_string())
    })?;

    // Cache (optional; lookups recompute without it).
    let (cache, cache_probe): (Arc<dyn ResponseCache>, Option<RedisCache>) =
        match &config.redis_url {
            Some(url) => match RedisCache::connect(url, config.cache_ttl).await {
                Ok(redis) => {
                    tracing::info!(ttl_secs = config.cache_ttl.as_secs(), "response cache enabled");
                    (Arc::new(redis.clone()), Some(redis))
                }
                Err(err) => {
                    tracing::warn!(error = %err, "cache connection failed; serving uncached");
                    (Arc::new(NoopCache), None)
                }
            },
            None => {
                tracing::warn!("REDIS_URL not set; serving uncached");
                (Arc::new(NoopCache), None)
            }
        };

    // Metrics recorder.
    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|err| anyhow::anyhow!("installing metrics recorder: {err}"))?;

    let service = TaxService::new(Arc::new(store.clone()), cache).with_config(ServiceConfig {
        op_timeout: config.op_timeout,
    });

    let state = AppState::new(Arc::new(service))
        .with_probes(Some(store), cache_probe)
        .with_metrics(metrics_handle);

    let app = ziptax_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, environment = %config.environment, "ziptax API listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolve when SIGINT or SIGTERM arrives, letting in-flight requests drain.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
