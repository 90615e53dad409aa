//! # Response Cache Contract
//!
//! The cache absorbs repeated lookups of the same ZIP code. It is strictly
//! best-effort: [`CacheError`] is deliberately not convertible into
//! [`crate::TaxError`], so a broken cache backend can never fail a lookup —
//! the service treats read failures as misses and discards write failures
//! after logging them.
//!
//! Entries carry a fixed TTL applied uniformly by the adapter; the engine
//! performs no expiry bookkeeping and never invalidates entries when backing
//! rates change (staleness bound = TTL).

use async_trait::async_trait;
use thiserror::Error;

use ziptax_core::ZipCode;

use crate::aggregate::TaxResult;

/// Error from the cache collaborator. Never propagated to engine callers.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The cache backend is unreachable or the operation failed.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be encoded or decoded.
    #[error("cache serialization failed: {0}")]
    Serialization(String),
}

/// Keyed storage for fully-aggregated responses.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Fetch the cached result for a ZIP code. `Ok(None)` is a miss.
    async fn get(&self, zip: &ZipCode) -> Result<Option<TaxResult>, CacheError>;

    /// Store a result under the ZIP code with the adapter's fixed TTL,
    /// overwriting any existing entry.
    async fn put(&self, zip: &ZipCode, result: &TaxResult) -> Result<(), CacheError>;
}

/// A cache that never hits and ignores writes.
///
/// Selected when no cache backend is configured: every lookup recomputes,
/// which is exactly the engine's degraded mode for an unavailable cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl ResponseCache for NoopCache {
    async fn get(&self, _zip: &ZipCode) -> Result<Option<TaxResult>, CacheError> {
        Ok(None)
    }

    async fn put(&self, _zip: &ZipCode, _result: &TaxResult) -> Result<(), CacheError> {
        Ok(())
    }
}
