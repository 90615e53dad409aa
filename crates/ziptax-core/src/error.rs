//! # Validation Errors
//!
//! Errors raised when constructing domain primitives from untrusted input.
//! All variants carry the offending value so callers can report exactly what
//! was rejected.

use thiserror::Error;

/// Error constructing a validated domain value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// ZIP code is not exactly five ASCII digits.
    #[error("invalid zip code {0:?}: must be exactly 5 digits")]
    InvalidZipCode(String),

    /// FIPS code is empty or carries non-alphanumeric characters.
    #[error("invalid fips code {0:?}")]
    InvalidFipsCode(String),

    /// Rate string could not be parsed as a non-negative decimal fraction.
    #[error("invalid rate {0:?}: expected a non-negative decimal such as \"0.0725\"")]
    InvalidRate(String),

    /// Money string could not be parsed, or the amount overflows.
    #[error("invalid amount {0:?}: expected a decimal such as \"100.00\"")]
    InvalidAmount(String),

    /// Arithmetic on a validated value overflowed its representation.
    #[error("arithmetic overflow: {0}")]
    Overflow(String),
}
