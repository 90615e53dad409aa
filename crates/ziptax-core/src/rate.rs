//! # Rate Records
//!
//! A [`RateRecord`] attaches one tax rate to one jurisdiction over a validity
//! window. The engine only ever consumes the *active general* rate of a
//! jurisdiction: rate type `general`, null expiry, most recent effective
//! date. That selection happens in the storage adapter; this module defines
//! what a selected record looks like.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::identity::FipsCode;
use crate::money::RateFraction;

/// The kind of tax a rate record describes.
///
/// Aggregation consumes only [`RateType::General`]; other strings from
/// storage (use-tax, lodging, ...) are preserved but never selected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RateType {
    /// The general sales/use rate consumed by aggregation.
    General,
    /// Any other rate type, preserved verbatim.
    Other(String),
}

impl RateType {
    /// Return the wire/storage string for this rate type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::General => "general",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for RateType {
    fn from(s: String) -> Self {
        if s == "general" {
            Self::General
        } else {
            Self::Other(s)
        }
    }
}

impl From<RateType> for String {
    fn from(kind: RateType) -> Self {
        match kind {
            RateType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for RateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tax rate attached to one jurisdiction.
///
/// For a given jurisdiction and rate type, at most one record has a null
/// expiry date at any instant. Should the backing store ever violate that,
/// selection picks the maximum effective date — a well-defined tie-break the
/// storage adapter implements in SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRecord {
    /// Numeric record identifier.
    pub id: i64,
    /// The jurisdiction this rate belongs to.
    pub fips_code: FipsCode,
    /// The fractional rate (e.g. `0.0725`).
    pub rate: RateFraction,
    /// Kind of tax this rate describes.
    pub rate_type: RateType,
    /// Date this rate came into effect.
    pub effective_date: NaiveDate,
    /// Expiry date; `None` means currently active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    /// Provenance of the rate (publication or feed identifier).
    pub source: String,
}

impl RateRecord {
    /// Whether this record is currently active (no expiry date).
    pub fn is_active(&self) -> bool {
        self.expiry_date.is_none()
    }
}
