//! # Address Resolution Strategy
//!
//! Turning a street address into jurisdictions is a swappable policy, not a
//! hardcoded path. [`AddressResolver`] is the seam; [`ZipFallbackResolver`]
//! is the shipping implementation, which deliberately reduces precision by
//! resolving through the address's ZIP code alone. A geocoding-backed
//! strategy (lat/lng to exact district boundaries) slots in behind the same
//! trait without touching the service.

use std::sync::Arc;

use async_trait::async_trait;

use ziptax_core::{Jurisdiction, ZipCode};

use crate::error::TaxError;
use crate::store::TaxStore;

/// A partially specified street address as received at the engine boundary.
///
/// All fields are raw caller input; only `zip` is load-bearing for the
/// shipping resolver.
#[derive(Debug, Clone, Default)]
pub struct StreetAddress {
    /// Street line, unused by the ZIP-fallback strategy.
    pub street: String,
    /// City name, unused by the ZIP-fallback strategy.
    pub city: String,
    /// State abbreviation, unused by the ZIP-fallback strategy.
    pub state: String,
    /// ZIP code — mandatory; resolution fails fast without it.
    pub zip: String,
}

/// Strategy for resolving a street address to its covering jurisdictions.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve an address to an ordered set of jurisdictions.
    ///
    /// An empty vec means no coverage. Implementations must fail with
    /// [`TaxError::InvalidInput`] before querying anything when the address
    /// lacks the fields they require.
    async fn resolve(&self, address: &StreetAddress) -> Result<Vec<Jurisdiction>, TaxError>;
}

/// The shipping resolver: degrade the address to its ZIP code.
///
/// Street, city, and state are ignored — a documented precision reduction.
/// Addresses that straddle a special-district boundary within one ZIP code
/// resolve to the ZIP-level jurisdiction set.
// TODO: integrate the Census Geocoder API for lat/lng -> FIPS resolution.
pub struct ZipFallbackResolver {
    store: Arc<dyn TaxStore>,
}

impl ZipFallbackResolver {
    /// Create a resolver backed by the given store.
    pub fn new(store: Arc<dyn TaxStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AddressResolver for ZipFallbackResolver {
    async fn resolve(&self, address: &StreetAddress) -> Result<Vec<Jurisdiction>, TaxError> {
        if address.zip.trim().is_empty() {
            return Err(TaxError::InvalidInput(
                "zip code is required for address resolution".to_string(),
            ));
        }
        let zip = ZipCode::parse(address.zip.trim())?;

        self.store
            .jurisdictions_for_zip(&zip)
            .await
            .map_err(|err| TaxError::Upstream {
                backend: "store",
                key: zip.to_string(),
                message: err.to_string(),
            })
    }
}
