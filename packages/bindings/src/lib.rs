use chrono::{Local, NaiveDate};
use napi::Result as NapiResult;
use napi_derive::napi;

use aligner_costing_core::aggregation::{self, compute_all, YearSelection};
use aligner_costing_core::pricing::PricingPolicy;
use aligner_costing_core::rates::{RateResolver, RateSetUpdate, YearlyRateTable};
use aligner_costing_core::types::Treatment;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_as_of(as_of: Option<String>) -> NapiResult<NaiveDate> {
    match as_of {
        Some(s) => s.parse::<NaiveDate>().map_err(to_napi_error),
        None => Ok(Local::now().date_naive()),
    }
}

fn parse_year(year: String) -> NapiResult<YearSelection> {
    year.parse::<YearSelection>().map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Treatment computation
// ---------------------------------------------------------------------------

/// Per-treatment cost/profit decomposition for the patient table.
#[napi]
pub fn compute_treatments(treatments_json: String, rates_json: String) -> NapiResult<String> {
    let treatments: Vec<Treatment> =
        serde_json::from_str(&treatments_json).map_err(to_napi_error)?;
    let table: YearlyRateTable = serde_json::from_str(&rates_json).map_err(to_napi_error)?;
    let output = compute_all(&treatments, &table, &PricingPolicy::default());
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

#[napi]
pub fn financial_summary(
    treatments_json: String,
    rates_json: String,
    year: String,
    as_of: Option<String>,
) -> NapiResult<String> {
    let treatments: Vec<Treatment> =
        serde_json::from_str(&treatments_json).map_err(to_napi_error)?;
    let table: YearlyRateTable = serde_json::from_str(&rates_json).map_err(to_napi_error)?;
    let selection = parse_year(year)?;
    let as_of = parse_as_of(as_of)?;

    let computed = compute_all(&treatments, &table, &PricingPolicy::default()).result;
    let filtered: Vec<_> = computed
        .into_iter()
        .filter(|c| selection.matches(c.treatment_year))
        .collect();
    let output = aggregation::financial_summary(&filtered, &table, selection, as_of);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn dashboard_stats(
    treatments_json: String,
    rates_json: String,
    year: String,
    as_of: Option<String>,
) -> NapiResult<String> {
    let treatments: Vec<Treatment> =
        serde_json::from_str(&treatments_json).map_err(to_napi_error)?;
    let table: YearlyRateTable = serde_json::from_str(&rates_json).map_err(to_napi_error)?;
    let selection = parse_year(year)?;
    let as_of = parse_as_of(as_of)?;

    let computed = compute_all(&treatments, &table, &PricingPolicy::default()).result;
    let filtered: Vec<_> = computed
        .into_iter()
        .filter(|c| selection.matches(c.treatment_year))
        .collect();
    let output = aggregation::dashboard_stats(&filtered, &table, selection, as_of);
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Rate administration
// ---------------------------------------------------------------------------

/// Fully-resolved rate set for one year, defaults filled in.
#[napi]
pub fn resolve_rates(rates_json: String, year: i32) -> NapiResult<String> {
    let table: YearlyRateTable = serde_json::from_str(&rates_json).map_err(to_napi_error)?;
    serde_json::to_string(&table.resolve(year)).map_err(to_napi_error)
}

/// Insert-or-update one year's rates; returns the updated table for the
/// caller to persist.
#[napi]
pub fn upsert_rates(rates_json: String, year: i32, update_json: String) -> NapiResult<String> {
    let mut table: YearlyRateTable = serde_json::from_str(&rates_json).map_err(to_napi_error)?;
    let update: RateSetUpdate = serde_json::from_str(&update_json).map_err(to_napi_error)?;
    table.upsert(year, update);
    serde_json::to_string(&table).map_err(to_napi_error)
}
