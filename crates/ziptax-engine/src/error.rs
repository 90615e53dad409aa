//! # Engine Error Taxonomy
//!
//! Three distinct error types, matching three distinct propagation policies:
//!
//! - [`TaxError`] — what callers of the engine see. Terminal per operation;
//!   the engine never retries.
//! - [`StoreError`] — raised by the storage collaborator, always wrapped
//!   into [`TaxError::Upstream`] with backend and key context before it
//!   reaches a caller.
//! - [`CacheError`] — lives in [`crate::cache`] and is deliberately *not*
//!   convertible into `TaxError`: cache failures degrade to recomputation
//!   and must never ride `?` propagation into a lookup failure.

use thiserror::Error;

use ziptax_core::{ValidationError, ZipCode};

/// Error from the storage collaborator (jurisdiction links and rate records).
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The backend is unreachable or the connection failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A query executed but failed, or returned rows the engine cannot use.
    #[error("store query failed: {0}")]
    Query(String),
}

/// Error surfaced by the resolution engine to its callers.
#[derive(Error, Debug, Clone)]
pub enum TaxError {
    /// No active jurisdictions cover the location. Distinct from a zero
    /// combined rate, which the engine never fabricates.
    #[error("no jurisdictions found for zip {0}")]
    NoJurisdictions(ZipCode),

    /// Structurally required input missing or malformed at the engine
    /// boundary (malformed zip, missing zip on an address lookup).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required backend failed. Carries which backend and which key so the
    /// caller can decide whether to retry.
    #[error("{backend} lookup failed for {key}: {message}")]
    Upstream {
        /// The failing backend ("store").
        backend: &'static str,
        /// The key being resolved when the failure occurred.
        key: String,
        /// The backend's error message.
        message: String,
    },

    /// The per-operation deadline expired before a backend answered.
    #[error("{backend} lookup for {key} timed out after {timeout_ms}ms")]
    Canceled {
        /// The backend that did not answer in time.
        backend: &'static str,
        /// The key being resolved when the deadline expired.
        key: String,
        /// The deadline that expired, in milliseconds.
        timeout_ms: u64,
    },
}

impl TaxError {
    /// Stable machine-readable code, used for per-item bulk error entries
    /// and HTTP status mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoJurisdictions(_) => "NOT_FOUND",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Upstream { .. } => "UPSTREAM_UNAVAILABLE",
            Self::Canceled { .. } => "TIMEOUT",
        }
    }
}

impl From<ValidationError> for TaxError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
