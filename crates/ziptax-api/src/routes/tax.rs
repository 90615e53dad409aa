//! # Tax Lookup API
//!
//! HTTP surface for the resolution engine:
//!
//! - **GET `/v1/tax/zip/{zip_code}`** — aggregated rates for a ZIP code
//!   (cache-aside)
//! - **GET `/v1/tax/address`** — aggregated rates for a street address
//!   (always recomputed)
//! - **POST `/v1/tax/calculate`** — tax owed and total for an amount
//! - **POST `/v1/tax/bulk`** — per-item lookup for 1–100 ZIP codes
//!
//! Handlers contain no business logic: they validate the transport
//! contract (amount positivity, batch size), delegate to the engine, and
//! convert [`TaxResult`]/[`CalculateResult`] into response DTOs. Rates and
//! amounts serialize as decimal strings.

use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use ziptax_core::Money;
use ziptax_engine::{CalculateResult, JurisdictionRate, Meta, RateBreakdown, StreetAddress, TaxError, TaxResult};

use crate::error::{AppError, ErrorBody};
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

/// Aggregated tax rates for one location.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaxResponse {
    /// The resolved ZIP code.
    pub zip_code: String,
    /// Sum of all included per-jurisdiction rates, as a decimal string.
    pub combined_rate: String,
    /// Per-tier totals.
    pub breakdown: BreakdownDto,
    /// Included jurisdictions in resolution order.
    pub jurisdictions: Vec<JurisdictionRateDto>,
    /// Response metadata.
    pub meta: MetaDto,
}

/// Per-tier rate totals.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BreakdownDto {
    pub state: String,
    pub county: String,
    pub city: String,
    pub special: String,
}

/// One jurisdiction's contribution.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JurisdictionRateDto {
    pub fips_code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub rate: String,
}

/// Response metadata.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MetaDto {
    pub last_updated: String,
    pub data_version: String,
    pub disclaimer: String,
}

/// Result of a monetary calculation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CalculateResponse {
    pub zip_code: String,
    pub amount: String,
    pub tax_rate: String,
    pub tax_amount: String,
    pub total: String,
    pub meta: MetaDto,
}

/// Per-item outcome of a bulk lookup.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum BulkOutcome {
    /// The item resolved successfully.
    Success(TaxResponse),
    /// The item failed with a typed error.
    Failure {
        /// The per-item error.
        error: BulkError,
    },
}

/// A typed per-item bulk error.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkError {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Bulk lookup response, keyed by the original input strings.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkResponse {
    pub results: HashMap<String, BulkOutcome>,
}

impl From<&TaxResult> for TaxResponse {
    fn from(result: &TaxResult) -> Self {
        Self {
            zip_code: result.zip_code.to_string(),
            combined_rate: result.combined_rate.to_string(),
            breakdown: BreakdownDto::from(&result.breakdown),
            jurisdictions: result
                .jurisdictions
                .iter()
                .map(JurisdictionRateDto::from)
                .collect(),
            meta: MetaDto::from(&result.meta),
        }
    }
}

impl From<&RateBreakdown> for BreakdownDto {
    fn from(breakdown: &RateBreakdown) -> Self {
        Self {
            state: breakdown.state.to_string(),
            county: breakdown.county.to_string(),
            city: breakdown.city.to_string(),
            special: breakdown.special.to_string(),
        }
    }
}

impl From<&JurisdictionRate> for JurisdictionRateDto {
    fn from(rate: &JurisdictionRate) -> Self {
        Self {
            fips_code: rate.fips_code.to_string(),
            name: rate.name.clone(),
            kind: rate.kind.to_string(),
            rate: rate.rate.to_string(),
        }
    }
}

impl From<&Meta> for MetaDto {
    fn from(meta: &Meta) -> Self {
        Self {
            last_updated: meta.last_updated.clone(),
            data_version: meta.data_version.clone(),
            disclaimer: meta.disclaimer.clone(),
        }
    }
}

impl From<&CalculateResult> for CalculateResponse {
    fn from(result: &CalculateResult) -> Self {
        Self {
            zip_code: result.zip_code.to_string(),
            amount: result.amount.to_string(),
            tax_rate: result.tax_rate.to_string(),
            tax_amount: result.tax_amount.to_string(),
            total: result.total.to_string(),
            meta: MetaDto::from(&result.meta),
        }
    }
}

impl From<&TaxError> for BulkError {
    fn from(err: &TaxError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Query parameters for the address lookup.
#[derive(Debug, Deserialize, Default)]
pub struct AddressParams {
    /// Street line (currently unused by resolution).
    #[serde(default)]
    pub street: String,
    /// City (currently unused by resolution).
    #[serde(default)]
    pub city: String,
    /// State abbreviation (currently unused by resolution).
    #[serde(default)]
    pub state: String,
    /// ZIP code — required.
    #[serde(default)]
    pub zip: String,
}

/// Request body for the calculate endpoint.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CalculateRequest {
    /// Five-digit ZIP code.
    pub zip_code: String,
    /// Decimal amount string (e.g. "100.00"). Must be strictly positive.
    pub amount: String,
}

impl Validate for CalculateRequest {
    fn validate(&self) -> Result<(), String> {
        if self.zip_code.trim().is_empty() {
            return Err("zip_code must not be empty".to_string());
        }
        let amount = Money::parse(&self.amount)
            .map_err(|_| "amount must be a valid decimal number".to_string())?;
        if !amount.is_positive() {
            return Err("amount must be positive".to_string());
        }
        Ok(())
    }
}

/// Request body for the bulk endpoint.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkRequest {
    /// 1–100 ZIP codes; duplicates and malformed entries are allowed and
    /// reported per item.
    pub zip_codes: Vec<String>,
}

/// Maximum batch size for bulk lookups.
const BULK_MAX_ITEMS: usize = 100;

impl Validate for BulkRequest {
    fn validate(&self) -> Result<(), String> {
        if self.zip_codes.is_empty() || self.zip_codes.len() > BULK_MAX_ITEMS {
            return Err(format!(
                "zip_codes must contain 1-{BULK_MAX_ITEMS} entries"
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Construct the tax lookup router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/tax/zip/{zip_code}", get(lookup_by_zip))
        .route("/v1/tax/address", get(lookup_by_address))
        .route("/v1/tax/calculate", post(calculate))
        .route("/v1/tax/bulk", post(bulk_lookup))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /v1/tax/zip/{zip_code} — aggregated rates for a ZIP code.
#[utoipa::path(
    get,
    path = "/v1/tax/zip/{zip_code}",
    params(("zip_code" = String, Path, description = "Five-digit ZIP code")),
    responses(
        (status = 200, description = "Aggregated tax rates", body = TaxResponse),
        (status = 404, description = "No jurisdictions cover the location", body = ErrorBody),
        (status = 422, description = "Malformed ZIP code", body = ErrorBody),
        (status = 503, description = "Backend unavailable", body = ErrorBody),
        (status = 504, description = "Backend timed out", body = ErrorBody)
    ),
    tag = "tax"
)]
pub(crate) async fn lookup_by_zip(
    State(state): State<AppState>,
    Path(zip_code): Path<String>,
) -> Result<Json<TaxResponse>, AppError> {
    let result = state.service.lookup_by_zip(&zip_code).await?;
    Ok(Json(TaxResponse::from(&result)))
}

/// GET /v1/tax/address — aggregated rates for a street address.
///
/// Always recomputes; never served from the cache.
#[utoipa::path(
    get,
    path = "/v1/tax/address",
    params(
        ("street" = Option<String>, Query, description = "Street line"),
        ("city" = Option<String>, Query, description = "City"),
        ("state" = Option<String>, Query, description = "State abbreviation"),
        ("zip" = String, Query, description = "Five-digit ZIP code (required)")
    ),
    responses(
        (status = 200, description = "Aggregated tax rates", body = TaxResponse),
        (status = 404, description = "No jurisdictions cover the address", body = ErrorBody),
        (status = 422, description = "Missing or malformed ZIP code", body = ErrorBody)
    ),
    tag = "tax"
)]
pub(crate) async fn lookup_by_address(
    State(state): State<AppState>,
    Query(params): Query<AddressParams>,
) -> Result<Json<TaxResponse>, AppError> {
    let address = StreetAddress {
        street: params.street,
        city: params.city,
        state: params.state,
        zip: params.zip,
    };
    let result = state.service.lookup_by_address(&address).await?;
    Ok(Json(TaxResponse::from(&result)))
}

/// POST /v1/tax/calculate — tax owed and total for an amount.
#[utoipa::path(
    post,
    path = "/v1/tax/calculate",
    request_body = CalculateRequest,
    responses(
        (status = 200, description = "Computed tax and total", body = CalculateResponse),
        (status = 400, description = "Malformed request body", body = ErrorBody),
        (status = 404, description = "No jurisdictions cover the location", body = ErrorBody),
        (status = 422, description = "Invalid ZIP code or non-positive amount", body = ErrorBody)
    ),
    tag = "tax"
)]
pub(crate) async fn calculate(
    State(state): State<AppState>,
    body: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<Json<CalculateResponse>, AppError> {
    let req = extract_validated_json(body)?;
    // Parse cannot fail after validation, but never unwrap on the request path.
    let amount = Money::parse(&req.amount)
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let result = state.service.calculate(&req.zip_code, amount).await?;
    Ok(Json(CalculateResponse::from(&result)))
}

/// POST /v1/tax/bulk — independent lookups for 1–100 ZIP codes.
///
/// One item's failure never aborts the batch: each key maps to either a
/// full response or a typed error.
#[utoipa::path(
    post,
    path = "/v1/tax/bulk",
    request_body = BulkRequest,
    responses(
        (status = 200, description = "Per-item outcomes", body = BulkResponse),
        (status = 400, description = "Malformed request body", body = ErrorBody),
        (status = 422, description = "Batch size out of range", body = ErrorBody)
    ),
    tag = "tax"
)]
pub(crate) async fn bulk_lookup(
    State(state): State<AppState>,
    body: Result<Json<BulkRequest>, JsonRejection>,
) -> Result<Json<BulkResponse>, AppError> {
    let req = extract_validated_json(body)?;

    let outcomes = state.service.bulk_lookup(&req.zip_codes).await;
    let results = outcomes
        .into_iter()
        .map(|(zip, outcome)| {
            let entry = match outcome {
                Ok(result) => BulkOutcome::Success(TaxResponse::from(&result)),
                Err(err) => BulkOutcome::Failure {
                    error: BulkError::from(&err),
                },
            };
            (zip, entry)
        })
        .collect();

    Ok(Json(BulkResponse { results }))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- request validation ----

    #[test]
    fn calculate_request_rejects_non_positive_amount() {
        let zero = CalculateRequest {
            zip_code: "94103".into(),
            amount: "0".into(),
        };
        assert!(zero.validate().is_err());

        let negative = CalculateRequest {
            zip_code: "94103".into(),
            amount: "-5.00".into(),
        };
        assert!(negative.validate().is_err());

        let positive = CalculateRequest {
            zip_code: "94103".into(),
            amount: "100.00".into(),
        };
        assert!(positive.validate().is_ok());
    }

    #[test]
    fn calculate_request_rejects_garbage_amount() {
        let req = CalculateRequest {
            zip_code: "94103".into(),
            amount: "a lot".into(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn bulk_request_enforces_batch_size() {
        let empty = BulkRequest { zip_codes: vec![] };
        assert!(empty.validate().is_err());

        let oversized = BulkRequest {
            zip_codes: vec!["94103".to_string(); 101],
        };
        assert!(oversized.validate().is_err());

        let fine = BulkRequest {
            zip_codes: vec!["94103".to_string(); 100],
        };
        assert!(fine.validate().is_ok());
    }

    // ---- DTO serialization ----

    #[test]
    fn bulk_outcome_serializes_untagged() {
        let failure = BulkOutcome::Failure {
            error: BulkError {
                code: "NOT_FOUND".into(),
                message: "no jurisdictions found for zip 99999".into(),
            },
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert!(json.get("Failure").is_none(), "must serialize untagged");
    }
}
