//! # Storage Collaborator Contract
//!
//! The engine's view of the relational store. Implementations own the query
//! shapes; the engine requires only the *results* of the selection rules:
//!
//! - Jurisdiction links filtered to currently-active (null expiry), ordered
//!   primary-first then store order.
//! - Active general rate = rate type `general`, null expiry, maximum
//!   effective date.
//!
//! The trait requires `Send + Sync`: the store is shared by every in-flight
//! request and must be safe for concurrent use. The engine never mutates
//! through it.

use std::collections::HashMap;

use async_trait::async_trait;

use ziptax_core::{FipsCode, Jurisdiction, RateRecord, ZipCode};

use crate::error::StoreError;

/// Read-only access to jurisdiction links and rate records.
#[async_trait]
pub trait TaxStore: Send + Sync {
    /// All jurisdictions whose link to `zip` is currently active, ordered
    /// primary-first then by store order. An empty vec means the location
    /// has no coverage — callers treat that as a lookup failure, never as a
    /// zero-rate result.
    async fn jurisdictions_for_zip(
        &self,
        zip: &ZipCode,
    ) -> Result<Vec<Jurisdiction>, StoreError>;

    /// The currently-active general rate for one jurisdiction: among records
    /// with rate type `general` and null expiry, the one with the maximum
    /// effective date. `None` when no record qualifies — that is a data
    /// condition, not an error.
    async fn active_rate(&self, fips: &FipsCode) -> Result<Option<RateRecord>, StoreError>;

    /// Batch variant of [`TaxStore::active_rate`]: the same selection rule
    /// applied independently per jurisdiction. Jurisdictions lacking an
    /// active rate are simply absent from the map.
    ///
    /// The default implementation loops over `active_rate`; adapters should
    /// override it with a single query where the backend allows.
    async fn active_rates(
        &self,
        fips_codes: &[FipsCode],
    ) -> Result<HashMap<FipsCode, RateRecord>, StoreError> {
        let mut rates = HashMap::with_capacity(fips_codes.len());
        for fips in fips_codes {
            if let Some(record) = self.active_rate(fips).await? {
                rates.insert(fips.clone(), record);
            }
        }
        Ok(rates)
    }
}
