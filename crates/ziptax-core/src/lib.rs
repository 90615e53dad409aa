//! # ziptax-core — Foundational Types
//!
//! The bedrock of the ziptax workspace. Defines the domain primitives that
//! enforce correctness guarantees at compile time. Every other crate depends
//! on `ziptax-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** [`ZipCode`] and [`FipsCode`]
//!    are validated at construction. No bare strings for identifiers.
//!
//! 2. **No binary floats in rate or money paths.** [`RateFraction`] is an
//!    integer count of millionths; [`Money`] is an integer count of cents.
//!    Both parse from and render to decimal strings, so summing tax rates
//!    and computing tax amounts is exact regardless of order.
//!
//! 3. **Unknown jurisdiction types survive deserialization.**
//!    [`JurisdictionType::Other`] preserves type strings this crate does not
//!    recognize, so a record read from storage is never silently coerced.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `ziptax-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod error;
pub mod identity;
pub mod jurisdiction;
pub mod money;
pub mod rate;

// Re-export primary types for ergonomic imports.
pub use error::ValidationError;
pub use identity::{FipsCode, ZipCode};
pub use jurisdiction::{Jurisdiction, JurisdictionType, RateTier};
pub use money::{Money, RateFraction};
pub use rate::{RateRecord, RateType};
