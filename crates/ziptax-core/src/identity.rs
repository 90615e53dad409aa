//! # Location & Jurisdiction Identifiers
//!
//! Newtype wrappers for the two identifier namespaces in ziptax. These
//! prevent accidental identifier confusion — you cannot pass a [`ZipCode`]
//! where a [`FipsCode`] is expected.
//!
//! Both types validate at construction and re-validate on deserialization
//! (`try_from = "String"`), so a cached or stored value can never carry an
//! identifier that would have been rejected at the API boundary.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A five-digit US postal code.
///
/// Construction rejects anything that is not exactly five ASCII digits.
/// This is the cache key and the primary location key of the whole system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ZipCode(String);

impl ZipCode {
    /// Parse a ZIP code, rejecting anything but exactly five ASCII digits.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if s.len() == 5 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(ValidationError::InvalidZipCode(s.to_string()))
        }
    }

    /// Access the ZIP code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ZipCode {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ZipCode> for String {
    fn from(zip: ZipCode) -> Self {
        zip.0
    }
}

impl std::fmt::Display for ZipCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A FIPS-style hierarchical jurisdiction code (e.g. `"06"` for California,
/// `"06075"` for San Francisco County).
///
/// Globally unique and stable across time. Validation is deliberately loose —
/// special districts use vendor-assigned alphanumeric suffixes — but empty
/// strings and embedded whitespace are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FipsCode(String);

impl FipsCode {
    /// Parse a FIPS code: non-empty, ASCII alphanumeric (plus `-`).
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            Ok(Self(s.to_string()))
        } else {
            Err(ValidationError::InvalidFipsCode(s.to_string()))
        }
    }

    /// Access the FIPS code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FipsCode {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<FipsCode> for String {
    fn from(fips: FipsCode) -> Self {
        fips.0
    }
}

impl std::fmt::Display for FipsCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
