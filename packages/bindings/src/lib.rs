use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;

use intrinsic_core::financials::{self, CashFlowStatement, FinancialsInput};
use intrinsic_core::scenarios::sensitivity::{self, SensitivityInput};
use intrinsic_core::valuation::dcf::{self, ValuationAssumptions};
use intrinsic_core::valuation::growth;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn valuate(financials_json: String, assumptions_json: String) -> NapiResult<String> {
    let financials = serde_json::from_str::<FinancialsInput>(&financials_json)
        .map_err(to_napi_error)?
        .into_financials();
    let assumptions: ValuationAssumptions =
        serde_json::from_str(&assumptions_json).map_err(to_napi_error)?;
    let output = dcf::valuate(&financials, &assumptions).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn sensitivity_grid(input_json: String) -> NapiResult<String> {
    let input: SensitivityInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = sensitivity::run_sensitivity(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

/// `values_json` is a JSON array of cash flows, oldest first.
#[napi]
pub fn cagr(values_json: String) -> NapiResult<String> {
    let values: Vec<Decimal> = serde_json::from_str(&values_json).map_err(to_napi_error)?;
    let estimate = growth::estimate_growth(&values, None);
    serde_json::to_string(&estimate).map_err(to_napi_error)
}

#[napi]
pub fn resolve_cash_flows(statement_json: String, min_years: Option<u32>) -> NapiResult<String> {
    let statement: CashFlowStatement =
        serde_json::from_str(&statement_json).map_err(to_napi_error)?;
    let min_years = min_years
        .map(|n| n as usize)
        .unwrap_or(financials::DEFAULT_MIN_HISTORY_YEARS);
    let resolved = financials::resolve_cash_flows(&statement, min_years);
    serde_json::to_string(&resolved).map_err(to_napi_error)
}
