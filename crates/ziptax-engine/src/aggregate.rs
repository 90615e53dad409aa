//! # Rate Aggregation
//!
//! Combines per-jurisdiction rates into a tiered breakdown and a combined
//! rate. [`aggregate`] is a pure function over the locator's jurisdiction
//! list and the batch rate map: no I/O, no randomness, fixed iteration order.
//! Re-aggregating the same inputs always yields an identical [`TaxResult`].
//!
//! ## Inclusion rules
//!
//! - A jurisdiction absent from the rate map has no active general rate and
//!   is skipped entirely — degraded-but-available behavior, never an error.
//! - A jurisdiction whose type maps to no tier ([`JurisdictionType::Other`])
//!   is listed in the per-jurisdiction contributions but contributes to no
//!   bucket, and therefore not to the combined rate. Both cases log at
//!   `debug!` so the omission is observable.
//!
//! The combined rate is the sum of the four bucket totals.

use serde::{Deserialize, Serialize};

use ziptax_core::{FipsCode, Jurisdiction, JurisdictionType, RateFraction, RateRecord, RateTier, ZipCode};

use std::collections::HashMap;

/// Fixed disclaimer attached to every response.
pub const DISCLAIMER: &str =
    "For informational purposes only. Not tax advice. Verify with local tax authorities.";

/// Per-tier rate totals. Each field is the sum of active rates of that tier —
/// normally zero or one contributing jurisdiction, but summed on overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBreakdown {
    /// State-tier total.
    pub state: RateFraction,
    /// County-tier total.
    pub county: RateFraction,
    /// City-tier total.
    pub city: RateFraction,
    /// Special-district-tier total.
    pub special: RateFraction,
}

impl RateBreakdown {
    /// Sum of the four tiers — the combined rate.
    pub fn combined(&self) -> RateFraction {
        self.state
            .saturating_add(self.county)
            .saturating_add(self.city)
            .saturating_add(self.special)
    }

    fn add(&mut self, tier: RateTier, rate: RateFraction) {
        let bucket = match tier {
            RateTier::State => &mut self.state,
            RateTier::County => &mut self.county,
            RateTier::City => &mut self.city,
            RateTier::Special => &mut self.special,
        };
        *bucket = bucket.saturating_add(rate);
    }
}

/// One jurisdiction's contribution to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionRate {
    /// The jurisdiction's stable identifier.
    pub fips_code: FipsCode,
    /// Display name.
    pub name: String,
    /// Jurisdiction type.
    #[serde(rename = "type")]
    pub kind: JurisdictionType,
    /// The active general rate.
    pub rate: RateFraction,
}

/// Response metadata.
///
/// `last_updated` and `data_version` are placeholders — they are not yet
/// populated from real provenance and serialize as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// When the backing data was last refreshed (unpopulated).
    pub last_updated: String,
    /// Version of the backing data set (unpopulated).
    pub data_version: String,
    /// Fixed disclaimer string.
    pub disclaimer: String,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            last_updated: String::new(),
            data_version: String::new(),
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}

/// The computed, cacheable artifact for one location key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxResult {
    /// The location key this result was computed for.
    pub zip_code: ZipCode,
    /// Sum of all included per-jurisdiction rates.
    pub combined_rate: RateFraction,
    /// Per-tier totals.
    pub breakdown: RateBreakdown,
    /// Included jurisdictions in locator order (plus tierless ones, listed
    /// but unsummed).
    pub jurisdictions: Vec<JurisdictionRate>,
    /// Response metadata.
    pub meta: Meta,
}

/// Aggregate per-jurisdiction rates into a tiered result.
///
/// `jurisdictions` must be in locator order (primary-first, then store
/// order); `rates` is the batch rate map, in which jurisdictions without an
/// active general rate are absent.
pub fn aggregate(
    zip: ZipCode,
    jurisdictions: &[Jurisdiction],
    rates: &HashMap<FipsCode, RateRecord>,
) -> TaxResult {
    let mut breakdown = RateBreakdown::default();
    let mut contributions = Vec::with_capacity(jurisdictions.len());

    for jurisdiction in jurisdictions {
        let Some(record) = rates.get(&jurisdiction.fips_code) else {
            // No active general rate: skip, keep the rest of the aggregation.
            tracing::debug!(
                fips = %jurisdiction.fips_code,
                zip = %zip,
                "jurisdiction has no active general rate; skipped from aggregation"
            );
            continue;
        };

        contributions.push(JurisdictionRate {
            fips_code: jurisdiction.fips_code.clone(),
            name: jurisdiction.name.clone(),
            kind: jurisdiction.kind.clone(),
            rate: record.rate,
        });

        match jurisdiction.kind.tier() {
            Some(tier) => breakdown.add(tier, record.rate),
            None => {
                tracing::debug!(
                    fips = %jurisdiction.fips_code,
                    kind = %jurisdiction.kind,
                    "jurisdiction type maps to no tier; listed but excluded from the combined rate"
                );
            }
        }
    }

    TaxResult {
        zip_code: zip,
        combined_rate: breakdown.combined(),
        breakdown,
        jurisdictions: contributions,
        meta: Meta::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ziptax_core::RateType;

    fn jurisdiction(fips: &str, name: &str, kind: JurisdictionType) -> Jurisdiction {
        Jurisdiction {
            fips_code: FipsCode::parse(fips).unwrap(),
            name: name.to_string(),
            kind,
            state_fips: FipsCode::parse("06").unwrap(),
            parent_fips: None,
            effective_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        }
    }

    fn rate(fips: &str, rate: &str) -> (FipsCode, RateRecord) {
        let fips = FipsCode::parse(fips).unwrap();
        (
            fips.clone(),
            RateRecord {
                id: 1,
                fips_code: fips,
                rate: RateFraction::parse(rate).unwrap(),
                rate_type: RateType::General,
                effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                expiry_date: None,
                source: "test".into(),
            },
        )
    }

    fn zip() -> ZipCode {
        ZipCode::parse("94103").unwrap()
    }

    // ---- combined rate and breakdown ----

    #[test]
    fn three_tier_aggregation_is_exact() {
        let jurisdictions = vec![
            jurisdiction("06", "California", JurisdictionType::State),
            jurisdiction("06075", "San Francisco County", JurisdictionType::County),
            jurisdiction("0667000", "San Francisco", JurisdictionType::City),
        ];
        let rates: HashMap<_, _> = [
            rate("06", "0.04"),
            rate("06075", "0.01"),
            rate("0667000", "0.02"),
        ]
        .into_iter()
        .collect();

        let result = aggregate(zip(), &jurisdictions, &rates);

        assert_eq!(result.combined_rate, RateFraction::parse("0.07").unwrap());
        assert_eq!(result.breakdown.state, RateFraction::parse("0.04").unwrap());
        assert_eq!(result.breakdown.county, RateFraction::parse("0.01").unwrap());
        assert_eq!(result.breakdown.city, RateFraction::parse("0.02").unwrap());
        assert_eq!(result.breakdown.special, RateFraction::ZERO);
        assert_eq!(result.jurisdictions.len(), 3);
    }

    #[test]
    fn missing_rate_is_skipped_not_fatal() {
        let jurisdictions = vec![
            jurisdiction("06", "California", JurisdictionType::State),
            jurisdiction("06075", "San Francisco County", JurisdictionType::County),
        ];
        // Only the state has an active rate.
        let rates: HashMap<_, _> = [rate("06", "0.04")].into_iter().collect();

        let result = aggregate(zip(), &jurisdictions, &rates);

        assert_eq!(result.jurisdictions.len(), 1);
        assert_eq!(result.combined_rate, RateFraction::parse("0.04").unwrap());
        assert_eq!(result.breakdown.county, RateFraction::ZERO);
    }

    #[test]
    fn unknown_type_listed_but_unsummed() {
        let jurisdictions = vec![
            jurisdiction("06", "California", JurisdictionType::State),
            jurisdiction("06XYZ", "Improvement Zone 9", JurisdictionType::from("improvement_zone")),
        ];
        let rates: HashMap<_, _> = [rate("06", "0.04"), rate("06XYZ", "0.01")]
            .into_iter()
            .collect();

        let result = aggregate(zip(), &jurisdictions, &rates);

        // Listed in contributions...
        assert_eq!(result.jurisdictions.len(), 2);
        assert_eq!(result.jurisdictions[1].name, "Improvement Zone 9");
        // ...but absent from every bucket and the combined rate.
        assert_eq!(result.combined_rate, RateFraction::parse("0.04").unwrap());
        assert_eq!(result.breakdown.combined(), result.combined_rate);
    }

    #[test]
    fn overlapping_same_type_jurisdictions_sum() {
        let jurisdictions = vec![
            jurisdiction("06A-SPD", "Transit District", JurisdictionType::SpecialDistrict),
            jurisdiction("06B-SPD", "Stadium District", JurisdictionType::SpecialDistrict),
        ];
        let rates: HashMap<_, _> = [rate("06A-SPD", "0.005"), rate("06B-SPD", "0.0025")]
            .into_iter()
            .collect();

        let result = aggregate(zip(), &jurisdictions, &rates);

        assert_eq!(result.breakdown.special, RateFraction::parse("0.0075").unwrap());
        assert_eq!(result.combined_rate, RateFraction::parse("0.0075").unwrap());
    }

    #[test]
    fn contributions_preserve_locator_order() {
        let jurisdictions = vec![
            jurisdiction("0667000", "San Francisco", JurisdictionType::City),
            jurisdiction("06", "California", JurisdictionType::State),
        ];
        let rates: HashMap<_, _> = [rate("0667000", "0.02"), rate("06", "0.04")]
            .into_iter()
            .collect();

        let result = aggregate(zip(), &jurisdictions, &rates);

        let order: Vec<&str> = result
            .jurisdictions
            .iter()
            .map(|j| j.fips_code.as_str())
            .collect();
        assert_eq!(order, vec!["0667000", "06"]);
    }

    #[test]
    fn empty_inputs_yield_zero_contributions() {
        let result = aggregate(zip(), &[], &HashMap::new());
        assert!(result.jurisdictions.is_empty());
        assert_eq!(result.combined_rate, RateFraction::ZERO);
    }

    #[test]
    fn meta_carries_disclaimer_and_empty_placeholders() {
        let result = aggregate(zip(), &[], &HashMap::new());
        assert_eq!(result.meta.disclaimer, DISCLAIMER);
        assert!(result.meta.last_updated.is_empty());
        assert!(result.meta.data_version.is_empty());
    }

    #[test]
    fn result_serde_roundtrip_is_lossless() {
        let jurisdictions = vec![jurisdiction("06", "California", JurisdictionType::State)];
        let rates: HashMap<_, _> = [rate("06", "0.0725")].into_iter().collect();
        let result = aggregate(zip(), &jurisdictions, &rates);

        let json = serde_json::to_string(&result).unwrap();
        let back: TaxResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }

    #[test]
    fn determinism_same_inputs_same_result() {
        let jurisdictions = vec![
            jurisdiction("06", "California", JurisdictionType::State),
            jurisdiction("06075", "San Francisco County", JurisdictionType::County),
        ];
        let rates: HashMap<_, _> = [rate("06", "0.04"), rate("06075", "0.01")]
            .into_iter()
            .collect();

        let first = aggregate(zip(), &jurisdictions, &rates);
        let second = aggregate(zip(), &jurisdictions, &rates);
        assert_eq!(first, second);
    }
}
