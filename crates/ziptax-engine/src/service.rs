//! # Tax Resolution Service
//!
//! Orchestrates locator, rate repository, aggregator, and cache for the four
//! engine operations: single ZIP lookup (cache-aside), address lookup
//! (always fresh), monetary calculation, and the bulk fan-out.
//!
//! ## Construction
//!
//! All collaborators are injected as trait objects — never ambient globals —
//! so tests substitute counting fakes and deployments pick real adapters:
//!
//! ```ignore
//! let service = TaxService::new(store, cache);               // zip-fallback resolver
//! let service = TaxService::new(store, cache)
//!     .with_resolver(geocoding_resolver);                    // swap the strategy
//! ```
//!
//! ## Deadlines
//!
//! Every store, resolver, and cache call is wrapped in
//! [`ServiceConfig::op_timeout`]. An expired store/resolver deadline surfaces
//! as [`TaxError::Canceled`]; an expired cache deadline degrades like any
//! other cache failure. Caller-side cancellation propagates structurally:
//! dropping a lookup future aborts every downstream await, including the
//! whole bulk fan-out.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use metrics::counter;
use serde::{Deserialize, Serialize};

use ziptax_core::{FipsCode, Money, RateFraction, ZipCode};

use crate::aggregate::{aggregate, Meta, TaxResult};
use crate::cache::ResponseCache;
use crate::error::{StoreError, TaxError};
use crate::resolver::{AddressResolver, StreetAddress, ZipFallbackResolver};
use crate::store::TaxStore;

/// Tunables for the resolution service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Deadline applied to every individual backend operation.
    pub op_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            op_timeout: Duration::from_secs(5),
        }
    }
}

/// Result of a monetary calculation against a location's combined rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculateResult {
    /// The location key the rate was resolved for.
    pub zip_code: ZipCode,
    /// The amount the calculation was requested for.
    pub amount: Money,
    /// The combined rate applied.
    pub tax_rate: RateFraction,
    /// `amount x tax_rate`, truncated toward zero.
    pub tax_amount: Money,
    /// `amount + tax_amount`.
    pub total: Money,
    /// Metadata from the underlying lookup.
    pub meta: Meta,
}

/// The resolution engine's orchestration layer. Stateless between calls;
/// safe to share behind an `Arc` across any number of concurrent requests.
pub struct TaxService {
    store: Arc<dyn TaxStore>,
    resolver: Arc<dyn AddressResolver>,
    cache: Arc<dyn ResponseCache>,
    config: ServiceConfig,
}

impl TaxService {
    /// Create a service with the default ZIP-fallback address resolver and
    /// default configuration.
    pub fn new(store: Arc<dyn TaxStore>, cache: Arc<dyn ResponseCache>) -> Self {
        let resolver = Arc::new(ZipFallbackResolver::new(Arc::clone(&store)));
        Self {
            store,
            resolver,
            cache,
            config: ServiceConfig::default(),
        }
    }

    /// Swap the address-resolution strategy.
    pub fn with_resolver(mut self, resolver: Arc<dyn AddressResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Override the service configuration.
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve a ZIP code to its aggregated tax result, cache-aside.
    ///
    /// Cache hit short-circuits the locator/repository/aggregator path
    /// entirely; on miss the freshly computed result is written back on a
    /// best-effort basis.
    pub async fn lookup_by_zip(&self, zip: &str) -> Result<TaxResult, TaxError> {
        let zip = ZipCode::parse(zip.trim())?;
        counter!("ziptax_lookups_total").increment(1);

        if let Some(hit) = self.cache_get(&zip).await {
            counter!("ziptax_cache_hits_total").increment(1);
            return Ok(hit);
        }
        counter!("ziptax_cache_misses_total").increment(1);

        let result = self.resolve_zip(&zip).await?;
        self.cache_put(&zip, &result).await;
        Ok(result)
    }

    /// Resolve a street address to its aggregated tax result.
    ///
    /// Never touches the cache — address lookups always recompute, even when
    /// an identical ZIP code was just cached.
    pub async fn lookup_by_address(
        &self,
        address: &StreetAddress,
    ) -> Result<TaxResult, TaxError> {
        counter!("ziptax_lookups_total").increment(1);

        let resolve = self.resolver.resolve(address);
        let jurisdictions = match tokio::time::timeout(self.config.op_timeout, resolve).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                return Err(TaxError::Canceled {
                    backend: "resolver",
                    key: address.zip.clone(),
                    timeout_ms: self.timeout_ms(),
                })
            }
        };

        let zip = ZipCode::parse(address.zip.trim())?;
        if jurisdictions.is_empty() {
            return Err(TaxError::NoJurisdictions(zip));
        }

        let rates = self.fetch_rates(&zip, &jurisdictions).await?;
        Ok(aggregate(zip, &jurisdictions, &rates))
    }

    /// Compute tax owed and total for an amount at a location's combined
    /// rate. Delegates to [`TaxService::lookup_by_zip`], so it benefits from
    /// the cache and inherits its failure modes.
    ///
    /// The amount is applied as-is — positivity is the transport boundary's
    /// concern, and multiplication is well-defined for any finite amount.
    pub async fn calculate(
        &self,
        zip: &str,
        amount: Money,
    ) -> Result<CalculateResult, TaxError> {
        let lookup = self.lookup_by_zip(zip).await?;
        let tax_amount = amount.apply_rate(lookup.combined_rate)?;
        let total = amount.checked_add(tax_amount)?;
        Ok(CalculateResult {
            zip_code: lookup.zip_code,
            amount,
            tax_rate: lookup.combined_rate,
            tax_amount,
            total,
            meta: lookup.meta,
        })
    }

    /// Resolve up to the transport-validated batch of ZIP codes, each
    /// independently. One item's failure — malformed input, no coverage, or
    /// a backend error — never aborts the batch; every outcome is recorded
    /// under its original input string. The fan-out runs concurrently with
    /// no ordering guarantee between items.
    pub async fn bulk_lookup(
        &self,
        zips: &[String],
    ) -> HashMap<String, Result<TaxResult, TaxError>> {
        let lookups = zips.iter().map(|zip| async move {
            (zip.clone(), self.lookup_by_zip(zip).await)
        });
        join_all(lookups).await.into_iter().collect()
    }

    // ---- internal plumbing ------------------------------------------------

    /// Full locator -> rate repository -> aggregator path for one ZIP code.
    async fn resolve_zip(&self, zip: &ZipCode) -> Result<TaxResult, TaxError> {
        let jurisdictions = self
            .timed_store(zip.as_str(), self.store.jurisdictions_for_zip(zip))
            .await?;
        if jurisdictions.is_empty() {
            return Err(TaxError::NoJurisdictions(zip.clone()));
        }

        let rates = self.fetch_rates(zip, &jurisdictions).await?;
        Ok(aggregate(zip.clone(), &jurisdictions, &rates))
    }

    /// Batch-fetch the active general rates for a jurisdiction list.
    async fn fetch_rates(
        &self,
        zip: &ZipCode,
        jurisdictions: &[ziptax_core::Jurisdiction],
    ) -> Result<HashMap<FipsCode, ziptax_core::RateRecord>, TaxError> {
        let fips_codes: Vec<FipsCode> = jurisdictions
            .iter()
            .map(|j| j.fips_code.clone())
            .collect();
        self.timed_store(zip.as_str(), self.store.active_rates(&fips_codes))
            .await
    }

    /// Apply the per-operation deadline to a store call, mapping failures to
    /// the caller-visible taxonomy.
    async fn timed_store<T>(
        &self,
        key: &str,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, TaxError> {
        match tokio::time::timeout(self.config.op_timeout, operation).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(TaxError::Upstream {
                backend: "store",
                key: key.to_string(),
                message: err.to_string(),
            }),
            Err(_) => Err(TaxError::Canceled {
                backend: "store",
                key: key.to_string(),
                timeout_ms: self.timeout_ms(),
            }),
        }
    }

    /// Cache read. Any failure — backend error or expired deadline — is a
    /// miss, logged at debug.
    async fn cache_get(&self, zip: &ZipCode) -> Option<TaxResult> {
        match tokio::time::timeout(self.config.op_timeout, self.cache.get(zip)).await {
            Ok(Ok(hit)) => hit,
            Ok(Err(err)) => {
                tracing::debug!(zip = %zip, error = %err, "cache read failed; treating as miss");
                None
            }
            Err(_) => {
                tracing::debug!(zip = %zip, "cache read timed out; treating as miss");
                None
            }
        }
    }

    /// Best-effort cache write. Failures are logged and explicitly
    /// discarded — they must never surface through the lookup path.
    async fn cache_put(&self, zip: &ZipCode, result: &TaxResult) {
        match tokio::time::timeout(self.config.op_timeout, self.cache.put(zip, result)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(zip = %zip, error = %err, "cache write failed; result served uncached");
            }
            Err(_) => {
                tracing::warn!(zip = %zip, "cache write timed out; result served uncached");
            }
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.config.op_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::cache::CacheError;
    use ziptax_core::{Jurisdiction, JurisdictionType, RateRecord, RateType};

    // ---- fakes -----------------------------------------------------------

    /// Counting in-memory store. `zip_calls`/`rate_calls` make the
    /// cache-idempotence and cache-bypass properties observable.
    struct FakeStore {
        zips: HashMap<String, Vec<Jurisdiction>>,
        rates: HashMap<FipsCode, RateRecord>,
        zip_calls: AtomicUsize,
        rate_calls: AtomicUsize,
        fail: bool,
        delay: Option<Duration>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                zips: HashMap::new(),
                rates: HashMap::new(),
                zip_calls: AtomicUsize::new(0),
                rate_calls: AtomicUsize::new(0),
                fail: false,
                delay: None,
            }
        }

        fn with_jurisdiction(mut self, zip: &str, fips: &str, kind: JurisdictionType, rate: Option<&str>) -> Self {
            let fips_code = FipsCode::parse(fips).unwrap();
            let jurisdiction = Jurisdiction {
                fips_code: fips_code.clone(),
                name: format!("Jurisdiction {fips}"),
                kind,
                state_fips: FipsCode::parse("06").unwrap(),
                parent_fips: None,
                effective_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            };
            self.zips.entry(zip.to_string()).or_default().push(jurisdiction);
            if let Some(rate) = rate {
                self.rates.insert(
                    fips_code.clone(),
                    RateRecord {
                        id: 1,
                        fips_code,
                        rate: RateFraction::parse(rate).unwrap(),
                        rate_type: RateType::General,
                        effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                        expiry_date: None,
                        source: "test".into(),
                    },
                );
            }
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl TaxStore for FakeStore {
        async fn jurisdictions_for_zip(
            &self,
            zip: &ZipCode,
        ) -> Result<Vec<Jurisdiction>, StoreError> {
            self.zip_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(StoreError::Unavailable("connection refused".into()));
            }
            Ok(self.zips.get(zip.as_str()).cloned().unwrap_or_default())
        }

        async fn active_rate(
            &self,
            fips: &FipsCode,
        ) -> Result<Option<RateRecord>, StoreError> {
            self.rate_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Unavailable("connection refused".into()));
            }
            Ok(self.rates.get(fips).cloned())
        }

        async fn active_rates(
            &self,
            fips_codes: &[FipsCode],
        ) -> Result<HashMap<FipsCode, RateRecord>, StoreError> {
            self.rate_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Unavailable("connection refused".into()));
            }
            Ok(fips_codes
                .iter()
                .filter_map(|f| self.rates.get(f).map(|r| (f.clone(), r.clone())))
                .collect())
        }
    }

    /// Counting in-memory cache.
    struct MemoryCache {
        entries: Mutex<HashMap<String, TaxResult>>,
        gets: AtomicUsize,
        puts: AtomicUsize,
    }

    impl MemoryCache {
        fn new() -> Self {
            Self {
                entries: Mutex::new(HashMap::new()),
                gets: AtomicUsize::new(0),
                puts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ResponseCache for MemoryCache {
        async fn get(&self, zip: &ZipCode) -> Result<Option<TaxResult>, CacheError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.lock().unwrap().get(zip.as_str()).cloned())
        }

        async fn put(&self, zip: &ZipCode, result: &TaxResult) -> Result<(), CacheError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.entries
                .lock()
                .unwrap()
                .insert(zip.to_string(), result.clone());
            Ok(())
        }
    }

    /// Cache whose every operation fails.
    struct BrokenCache;

    #[async_trait]
    impl ResponseCache for BrokenCache {
        async fn get(&self, _zip: &ZipCode) -> Result<Option<TaxResult>, CacheError> {
            Err(CacheError::Unavailable("redis down".into()))
        }

        async fn put(&self, _zip: &ZipCode, _result: &TaxResult) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("redis down".into()))
        }
    }

    fn covered_store() -> FakeStore {
        FakeStore::new()
            .with_jurisdiction("94103", "06", JurisdictionType::State, Some("0.04"))
            .with_jurisdiction("94103", "06075", JurisdictionType::County, Some("0.01"))
            .with_jurisdiction("94103", "0667000", JurisdictionType::City, Some("0.02"))
    }

    fn service_over(store: Arc<FakeStore>, cache: Arc<dyn ResponseCache>) -> TaxService {
        TaxService::new(store, cache)
    }

    // ---- single lookup ---------------------------------------------------

    #[tokio::test]
    async fn lookup_aggregates_all_tiers() {
        let store = Arc::new(covered_store());
        let service = service_over(Arc::clone(&store), Arc::new(MemoryCache::new()));

        let result = service.lookup_by_zip("94103").await.unwrap();

        assert_eq!(result.combined_rate, RateFraction::parse("0.07").unwrap());
        assert_eq!(result.breakdown.state, RateFraction::parse("0.04").unwrap());
        assert_eq!(result.breakdown.county, RateFraction::parse("0.01").unwrap());
        assert_eq!(result.breakdown.city, RateFraction::parse("0.02").unwrap());
        assert_eq!(result.breakdown.special, RateFraction::ZERO);
        assert_eq!(result.jurisdictions.len(), 3);
    }

    #[tokio::test]
    async fn unmapped_zip_is_not_found_never_zero_rate() {
        let store = Arc::new(covered_store());
        let service = service_over(store, Arc::new(MemoryCache::new()));

        let err = service.lookup_by_zip("99999").await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_zip_is_invalid_input() {
        let store = Arc::new(covered_store());
        let service = service_over(store, Arc::new(MemoryCache::new()));

        let err = service.lookup_by_zip("94-03").await.unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn missing_rate_jurisdiction_is_skipped() {
        let store = Arc::new(
            FakeStore::new()
                .with_jurisdiction("94103", "06", JurisdictionType::State, Some("0.04"))
                .with_jurisdiction("94103", "06075", JurisdictionType::County, None),
        );
        let service = service_over(store, Arc::new(MemoryCache::new()));

        let result = service.lookup_by_zip("94103").await.unwrap();

        assert_eq!(result.jurisdictions.len(), 1);
        assert_eq!(result.combined_rate, RateFraction::parse("0.04").unwrap());
    }

    // ---- cache behavior --------------------------------------------------

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let store = Arc::new(covered_store());
        let cache = Arc::new(MemoryCache::new());
        let service = service_over(Arc::clone(&store), cache.clone());

        let first = service.lookup_by_zip("94103").await.unwrap();
        let second = service.lookup_by_zip("94103").await.unwrap();

        // Identical contents, and the store was only consulted once.
        assert_eq!(first, second);
        assert_eq!(store.zip_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.rate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn address_lookup_bypasses_cache() {
        let store = Arc::new(covered_store());
        let cache = Arc::new(MemoryCache::new());
        let service = service_over(Arc::clone(&store), cache.clone());

        // Prime the cache via the zip path.
        service.lookup_by_zip("94103").await.unwrap();
        assert_eq!(store.zip_calls.load(Ordering::SeqCst), 1);

        let address = StreetAddress {
            street: "1455 Market St".into(),
            city: "San Francisco".into(),
            state: "CA".into(),
            zip: "94103".into(),
        };
        let result = service.lookup_by_address(&address).await.unwrap();

        // Recomputed: the store was hit again, the cache read count did not move.
        assert_eq!(store.zip_calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.gets.load(Ordering::SeqCst), 1);
        assert_eq!(result.combined_rate, RateFraction::parse("0.07").unwrap());
    }

    #[tokio::test]
    async fn address_lookup_requires_zip() {
        let store = Arc::new(covered_store());
        let service = service_over(store, Arc::new(MemoryCache::new()));

        let address = StreetAddress {
            street: "1 Main St".into(),
            ..Default::default()
        };
        let err = service.lookup_by_address(&address).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn broken_cache_degrades_to_recomputation() {
        let store = Arc::new(covered_store());
        let service = service_over(Arc::clone(&store), Arc::new(BrokenCache));

        let first = service.lookup_by_zip("94103").await.unwrap();
        let second = service.lookup_by_zip("94103").await.unwrap();

        // Same correct answer both times; every lookup recomputed.
        assert_eq!(first.combined_rate, RateFraction::parse("0.07").unwrap());
        assert_eq!(first, second);
        assert_eq!(store.zip_calls.load(Ordering::SeqCst), 2);
    }

    // ---- calculate -------------------------------------------------------

    #[tokio::test]
    async fn calculate_applies_combined_rate() {
        let store = Arc::new(
            FakeStore::new()
                .with_jurisdiction("73301", "48", JurisdictionType::State, Some("0.08")),
        );
        let service = service_over(store, Arc::new(MemoryCache::new()));

        let result = service
            .calculate("73301", Money::parse("100.00").unwrap())
            .await
            .unwrap();

        assert_eq!(result.tax_rate, RateFraction::parse("0.08").unwrap());
        assert_eq!(result.tax_amount.to_string(), "8.00");
        assert_eq!(result.total.to_string(), "108.00");
    }

    #[tokio::test]
    async fn calculate_inherits_lookup_failures() {
        let store = Arc::new(covered_store());
        let service = service_over(store, Arc::new(MemoryCache::new()));

        let err = service
            .calculate("99999", Money::parse("10.00").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    // ---- bulk ------------------------------------------------------------

    #[tokio::test]
    async fn bulk_records_each_outcome_independently() {
        let store = Arc::new(covered_store());
        let service = service_over(store, Arc::new(MemoryCache::new()));

        let zips = vec![
            "94103".to_string(), // covered
            "99999".to_string(), // uncovered
            "nope".to_string(),  // malformed
        ];
        let outcomes = service.bulk_lookup(&zips).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes["94103"].is_ok());
        assert_eq!(outcomes["99999"].as_ref().unwrap_err().code(), "NOT_FOUND");
        assert_eq!(outcomes["nope"].as_ref().unwrap_err().code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn bulk_duplicate_keys_resolve_consistently() {
        let store = Arc::new(covered_store());
        let service = service_over(store, Arc::new(MemoryCache::new()));

        let zips = vec!["94103".to_string(), "94103".to_string()];
        let outcomes = service.bulk_lookup(&zips).await;

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes["94103"].is_ok());
    }

    // ---- upstream failures and deadlines ---------------------------------

    #[tokio::test]
    async fn store_failure_surfaces_as_upstream() {
        let store = Arc::new(covered_store().failing());
        let service = service_over(store, Arc::new(MemoryCache::new()));

        let err = service.lookup_by_zip("94103").await.unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_UNAVAILABLE");
        let text = err.to_string();
        assert!(text.contains("store"));
        assert!(text.contains("94103"));
    }

    #[tokio::test]
    async fn slow_store_surfaces_as_canceled() {
        let store = Arc::new(covered_store().delayed(Duration::from_millis(200)));
        let service = service_over(store, Arc::new(MemoryCache::new())).with_config(
            ServiceConfig {
                op_timeout: Duration::from_millis(10),
            },
        );

        let err = service.lookup_by_zip("94103").await.unwrap_err();
        assert_eq!(err.code(), "TIMEOUT");
    }

    #[tokio::test]
    async fn bulk_survives_a_broken_cache() {
        let store = Arc::new(covered_store());
        let service = service_over(store, Arc::new(BrokenCache));

        let zips = vec!["94103".to_string(), "99999".to_string()];
        let outcomes = service.bulk_lookup(&zips).await;

        assert!(outcomes["94103"].is_ok());
        assert!(outcomes["99999"].is_err());
    }
}
