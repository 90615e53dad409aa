//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ziptax API",
        version = "0.1.0",
        description = "Resolves ZIP codes and street addresses to overlapping tax jurisdictions and their combined, tier-broken-down rates.",
        license(name = "MIT")
    ),
    paths(
        crate::routes::tax::lookup_by_zip,
        crate::routes::tax::lookup_by_address,
        crate::routes::tax::calculate,
        crate::routes::tax::bulk_lookup,
    ),
    components(schemas(
        crate::routes::tax::TaxResponse,
        crate::routes::tax::BreakdownDto,
        crate::routes::tax::JurisdictionRateDto,
        crate::routes::tax::MetaDto,
        crate::routes::tax::CalculateRequest,
        crate::routes::tax::CalculateResponse,
        crate::routes::tax::BulkRequest,
        crate::routes::tax::BulkResponse,
        crate::routes::tax::BulkOutcome,
        crate::routes::tax::BulkError,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    ))
)]
pub struct ApiDoc;

/// Construct the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_spec))
}

/// GET /openapi.json — the generated spec.
async fn serve_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
