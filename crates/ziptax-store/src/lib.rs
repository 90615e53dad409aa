//! # ziptax-store — Postgres Storage Adapter
//!
//! Implements the engine's [`TaxStore`] contract over a `sqlx` Postgres
//! pool. The adapter owns the query shapes; the selection rules it must
//! produce the results of are:
//!
//! - **Jurisdictions for a ZIP**: currently-active links only
//!   (`expiry_date IS NULL`), primary-first, then a stable store order.
//! - **Active general rate**: `rate_type = 'general'`, `expiry_date IS NULL`,
//!   maximum `effective_date`. Should two null-expiry general rows ever
//!   coexist for one jurisdiction, the `ORDER BY effective_date DESC`
//!   tie-break keeps selection well-defined.
//!
//! Rates travel as `NUMERIC::text` and parse into [`RateFraction`] — binary
//! floats never appear between the database and the engine. A row whose rate
//! text does not parse is a [`StoreError::Query`], not a silent zero.
//!
//! The schema lives in `migrations/0001_init.sql`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use ziptax_core::{FipsCode, Jurisdiction, JurisdictionType, RateFraction, RateRecord, RateType, ZipCode};
use ziptax_engine::{StoreError, TaxStore};

const JURISDICTIONS_BY_ZIP: &str = "\
    SELECT j.fips_code, j.name, j.type, j.state_fips, j.parent_fips, j.effective_date
    FROM zip_jurisdictions z
    JOIN jurisdictions j ON j.fips_code = z.fips_code
    WHERE z.zip_code = $1
      AND z.expiry_date IS NULL
    ORDER BY z.is_primary DESC, j.fips_code";

const ACTIVE_RATE_BY_FIPS: &str = "\
    SELECT id, fips_code, rate::text AS rate, rate_type, effective_date, expiry_date, source
    FROM rates
    WHERE fips_code = $1
      AND expiry_date IS NULL
      AND rate_type = 'general'
    ORDER BY effective_date DESC
    LIMIT 1";

const ACTIVE_RATES_BY_FIPS: &str = "\
    SELECT DISTINCT ON (fips_code)
           id, fips_code, rate::text AS rate, rate_type, effective_date, expiry_date, source
    FROM rates
    WHERE fips_code = ANY($1)
      AND expiry_date IS NULL
      AND rate_type = 'general'
    ORDER BY fips_code, effective_date DESC";

const DATA_FRESHNESS: &str = "SELECT MAX(updated_at) FROM jurisdictions";

/// Postgres-backed [`TaxStore`]. Cheap to clone; the pool is shared.
#[derive(Debug, Clone)]
pub struct PgTaxStore {
    pool: PgPool,
}

impl PgTaxStore {
    /// Connect to Postgres and verify the connection with a ping.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|err| StoreError::Unavailable(format!("connecting to database: {err}")))?;
        let store = Self { pool };
        store.ping().await?;
        Ok(store)
    }

    /// Wrap an existing pool (tests, shared pools).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verify database connectivity.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|err| StoreError::Unavailable(format!("pinging database: {err}")))
    }

    /// When the jurisdiction data set was last refreshed, if ever.
    pub async fn data_freshness(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row: (Option<DateTime<Utc>>,) = sqlx::query_as(DATA_FRESHNESS)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| StoreError::Query(format!("querying data freshness: {err}")))?;
        Ok(row.0)
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaxStore for PgTaxStore {
    async fn jurisdictions_for_zip(
        &self,
        zip: &ZipCode,
    ) -> Result<Vec<Jurisdiction>, StoreError> {
        let rows = sqlx::query_as::<_, JurisdictionRow>(JURISDICTIONS_BY_ZIP)
            .bind(zip.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|err| map_sqlx(err, "querying jurisdictions"))?;

        rows.into_iter().map(JurisdictionRow::into_domain).collect()
    }

    async fn active_rate(&self, fips: &FipsCode) -> Result<Option<RateRecord>, StoreError> {
        let row = sqlx::query_as::<_, RateRow>(ACTIVE_RATE_BY_FIPS)
            .bind(fips.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_sqlx(err, "querying rate"))?;

        row.map(RateRow::into_domain).transpose()
    }

    async fn active_rates(
        &self,
        fips_codes: &[FipsCode],
    ) -> Result<HashMap<FipsCode, RateRecord>, StoreError> {
        let codes: Vec<String> = fips_codes
            .iter()
            .map(|f| f.as_str().to_string())
            .collect();
        let rows = sqlx::query_as::<_, RateRow>(ACTIVE_RATES_BY_FIPS)
            .bind(&codes)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| map_sqlx(err, "querying rates"))?;

        let mut rates = HashMap::with_capacity(rows.len());
        for row in rows {
            let record = row.into_domain()?;
            rates.insert(record.fips_code.clone(), record);
        }
        Ok(rates)
    }
}

/// Classify a sqlx failure: connection-level problems are `Unavailable`,
/// everything else is `Query`.
fn map_sqlx(err: sqlx::Error, context: &str) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{context}: {err}"))
        }
        _ => StoreError::Query(format!("{context}: {err}")),
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct JurisdictionRow {
    fips_code: String,
    name: String,
    #[sqlx(rename = "type")]
    kind: String,
    state_fips: String,
    parent_fips: Option<String>,
    effective_date: NaiveDate,
}

impl JurisdictionRow {
    fn into_domain(self) -> Result<Jurisdiction, StoreError> {
        let fips_code = FipsCode::parse(&self.fips_code)
            .map_err(|err| StoreError::Query(format!("invalid fips_code in row: {err}")))?;
        let state_fips = FipsCode::parse(&self.state_fips)
            .map_err(|err| StoreError::Query(format!("invalid state_fips in row: {err}")))?;
        let parent_fips = self
            .parent_fips
            .map(|p| {
                FipsCode::parse(&p)
                    .map_err(|err| StoreError::Query(format!("invalid parent_fips in row: {err}")))
            })
            .transpose()?;

        Ok(Jurisdiction {
            fips_code,
            name: self.name,
            kind: JurisdictionType::from(self.kind),
            state_fips,
            parent_fips,
            effective_date: self.effective_date,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RateRow {
    id: i64,
    fips_code: String,
    rate: String,
    rate_type: String,
    effective_date: NaiveDate,
    expiry_date: Option<NaiveDate>,
    source: String,
}

impl RateRow {
    fn into_domain(self) -> Result<RateRecord, StoreError> {
        let fips_code = FipsCode::parse(&self.fips_code)
            .map_err(|err| StoreError::Query(format!("invalid fips_code in rate row: {err}")))?;
        let rate = RateFraction::parse(&self.rate).map_err(|err| {
            StoreError::Query(format!(
                "unparseable rate for {}: {err}",
                self.fips_code
            ))
        })?;

        Ok(RateRecord {
            id: self.id,
            fips_code,
            rate,
            rate_type: RateType::from(self.rate_type),
            effective_date: self.effective_date,
            expiry_date: self.expiry_date,
            source: self.source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Query-shape tests run against a live database in CI; here we pin the
    // row-to-domain conversion rules, which need no connection.

    #[test]
    fn jurisdiction_row_converts() {
        let row = JurisdictionRow {
            fips_code: "06075".into(),
            name: "San Francisco County".into(),
            kind: "county".into(),
            state_fips: "06".into(),
            parent_fips: Some("06".into()),
            effective_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        };
        let jurisdiction = row.into_domain().unwrap();
        assert_eq!(jurisdiction.kind, JurisdictionType::County);
        assert_eq!(jurisdiction.fips_code.as_str(), "06075");
        assert_eq!(jurisdiction.parent_fips.unwrap().as_str(), "06");
    }

    #[test]
    fn unknown_jurisdiction_type_is_preserved() {
        let row = JurisdictionRow {
            fips_code: "06XYZ".into(),
            name: "Improvement Zone".into(),
            kind: "improvement_zone".into(),
            state_fips: "06".into(),
            parent_fips: None,
            effective_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        };
        let jurisdiction = row.into_domain().unwrap();
        assert_eq!(jurisdiction.kind.as_str(), "improvement_zone");
        assert_eq!(jurisdiction.kind.tier(), None);
    }

    #[test]
    fn rate_row_parses_numeric_text() {
        let row = RateRow {
            id: 7,
            fips_code: "06".into(),
            rate: "0.072500".into(),
            rate_type: "general".into(),
            effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            expiry_date: None,
            source: "CDTFA".into(),
        };
        let record = row.into_domain().unwrap();
        assert_eq!(record.rate, RateFraction::parse("0.0725").unwrap());
        assert_eq!(record.rate_type, RateType::General);
        assert!(record.is_active());
    }

    #[test]
    fn unparseable_rate_is_a_query_error() {
        let row = RateRow {
            id: 7,
            fips_code: "06".into(),
            rate: "seven percent".into(),
            rate_type: "general".into(),
            effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            expiry_date: None,
            source: "CDTFA".into(),
        };
        let err = row.into_domain().unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
        assert!(err.to_string().contains("06"));
    }
}
