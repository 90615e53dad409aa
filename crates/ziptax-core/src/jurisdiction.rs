//! # Jurisdiction Types
//!
//! A jurisdiction is a taxing authority — a state, county, city, or special
//! district — identified by a stable FIPS-style code. Every jurisdiction type
//! maps to exactly one breakdown tier (or none, for types this crate does not
//! recognize), and that mapping is the single source of truth for how rates
//! are bucketed during aggregation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::identity::FipsCode;

/// The type of a taxing jurisdiction.
///
/// The four known variants map to breakdown tiers via [`JurisdictionType::tier`].
/// Type strings from storage that match none of them are preserved in
/// [`JurisdictionType::Other`]: such jurisdictions are still listed in
/// responses but contribute to no tier and therefore not to the combined rate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JurisdictionType {
    /// State-level taxing authority.
    State,
    /// County-level taxing authority.
    County,
    /// City or municipal taxing authority.
    City,
    /// Special-purpose district (transit, stadium, hospital, ...).
    SpecialDistrict,
    /// A type string this crate does not recognize, preserved verbatim.
    Other(String),
}

impl JurisdictionType {
    /// Return the wire/storage string for this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::State => "state",
            Self::County => "county",
            Self::City => "city",
            Self::SpecialDistrict => "special_district",
            Self::Other(s) => s,
        }
    }

    /// The breakdown tier this type contributes to, or `None` for
    /// unrecognized types (listed but never summed).
    pub fn tier(&self) -> Option<RateTier> {
        match self {
            Self::State => Some(RateTier::State),
            Self::County => Some(RateTier::County),
            Self::City => Some(RateTier::City),
            Self::SpecialDistrict => Some(RateTier::Special),
            Self::Other(_) => None,
        }
    }

    /// The four recognized variants.
    pub fn known() -> &'static [JurisdictionType] {
        &[
            Self::State,
            Self::County,
            Self::City,
            Self::SpecialDistrict,
        ]
    }
}

impl From<String> for JurisdictionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "state" => Self::State,
            "county" => Self::County,
            "city" => Self::City,
            "special_district" => Self::SpecialDistrict,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for JurisdictionType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<JurisdictionType> for String {
    fn from(kind: JurisdictionType) -> Self {
        match kind {
            JurisdictionType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for JurisdictionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the four aggregation buckets of a rate breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateTier {
    /// State tier.
    State,
    /// County tier.
    County,
    /// City tier.
    City,
    /// Special-district tier.
    Special,
}

/// A taxing jurisdiction as returned by the locator.
///
/// The identifier is globally unique and stable across time; a jurisdiction's
/// type never changes once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jurisdiction {
    /// Stable hierarchical identifier.
    pub fips_code: FipsCode,
    /// Display name (e.g. "California", "San Francisco County").
    pub name: String,
    /// Jurisdiction type, deciding the breakdown tier.
    #[serde(rename = "type")]
    pub kind: JurisdictionType,
    /// Identifier of the enclosing state-level jurisdiction.
    pub state_fips: FipsCode,
    /// Direct parent jurisdiction, absent for top-level jurisdictions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_fips: Option<FipsCode>,
    /// Date this jurisdiction came into effect.
    pub effective_date: NaiveDate,
}
