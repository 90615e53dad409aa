//! # ziptax-engine — Jurisdiction Resolution & Rate Aggregation
//!
//! The core of ziptax: the logic that turns a raw location key into a cached,
//! versioned, tiered tax-rate response.
//!
//! ## Data Flow
//!
//! ```text
//! zip -> locator (TaxStore) -> jurisdictions
//!     -> batch rate fetch (TaxStore) -> active general rates
//!     -> aggregate() -> TaxResult
//!     -> ResponseCache (best-effort write)
//! ```
//!
//! Repeat lookups of the same zip short-circuit the whole pipeline at the
//! cache. Address lookups never touch the cache and always recompute.
//!
//! ## Collaborator Seams
//!
//! Storage ([`TaxStore`]), address resolution ([`AddressResolver`]) and the
//! response cache ([`ResponseCache`]) are trait objects injected into
//! [`TaxService`] at construction. Tests substitute counting fakes; the
//! `ziptax-store` and `ziptax-cache` crates provide the Postgres and Redis
//! implementations.
//!
//! ## Failure Policy
//!
//! - A jurisdiction without an active general rate is skipped, never fatal.
//! - Cache failures (reads, writes, timeouts) degrade to recomputation and
//!   are invisible to callers.
//! - Store failures always surface, wrapped with backend and key context.
//! - Deadline expiry surfaces as [`TaxError::Canceled`], distinct from
//!   [`TaxError::Upstream`], so callers can tell "try again" from "gave up".
//!
//! ## Crate Policy
//!
//! - Stateless between calls; no engine-level locking.
//! - No internal retries — failures propagate once.
//! - No `unsafe`, no `panic!()`/`.unwrap()` outside tests.

pub mod aggregate;
pub mod cache;
pub mod error;
pub mod resolver;
pub mod service;
pub mod store;

pub use aggregate::{aggregate, JurisdictionRate, Meta, RateBreakdown, TaxResult, DISCLAIMER};
pub use cache::{CacheError, NoopCache, ResponseCache};
pub use error::{StoreError, TaxError};
pub use resolver::{AddressResolver, StreetAddress, ZipFallbackResolver};
pub use service::{CalculateResult, ServiceConfig, TaxService};
pub use store::TaxStore;
