//! # Configuration
//!
//! Environment-driven configuration for the server binary. `DATABASE_URL`
//! is required; everything else has a sensible default. A missing
//! `REDIS_URL` disables caching (the engine degrades to recomputation)
//! rather than refusing to boot.

use std::time::Duration;

use thiserror::Error;

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("{0} is required")]
    Missing(&'static str),
}

/// Server configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port to bind (`PORT`, default 8080).
    pub port: u16,
    /// Postgres connection string (`DATABASE_URL`, required).
    pub database_url: String,
    /// Redis connection string (`REDIS_URL`, optional — absent disables
    /// caching).
    pub redis_url: Option<String>,
    /// Cache entry TTL (`CACHE_TTL_HOURS`, default 24).
    pub cache_ttl: Duration,
    /// Per-backend-operation deadline (`OP_TIMEOUT_MS`, default 5000).
    pub op_timeout: Duration,
    /// Deployment environment label (`ENVIRONMENT`, default "production").
    pub environment: String,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => return Err(ConfigError::Missing("DATABASE_URL")),
        };

        let redis_url = std::env::var("REDIS_URL").ok().filter(|url| !url.is_empty());

        Ok(Self {
            port: env_or_parse("PORT", 8080),
            database_url,
            redis_url,
            cache_ttl: Duration::from_secs(env_or_parse("CACHE_TTL_HOURS", 24u64) * 3600),
            op_timeout: Duration::from_millis(env_or_parse("OP_TIMEOUT_MS", 5000u64)),
            environment: env_or("ENVIRONMENT", "production"),
        })
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => fallback.to_string(),
    }
}

/// Read and parse an environment variable, falling back on absence or an
/// unparseable value.
fn env_or_parse<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(fallback)
}
