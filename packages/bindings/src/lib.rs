use std::str::FromStr;

use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;

use solar_finance_core::EngineConfig;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Decimals cross the boundary as strings so no precision is lost to f64.
fn parse_decimal(field: &str, raw: &str) -> NapiResult<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|e| to_napi_error(format!("{field}: '{raw}' is not a decimal ({e})")))
}

// ---------------------------------------------------------------------------
// Financing
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_loan(input_json: String) -> NapiResult<String> {
    let input: solar_finance_core::financing::rate_solver::LoanTerms =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        solar_finance_core::financing::rate_solver::analyze_loan(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Bare rate detection: `detectRate("30000", 48, "789.91")`.
#[napi]
pub fn detect_rate(
    financed_value: String,
    installments: u32,
    installment_value: String,
) -> NapiResult<String> {
    let result = solar_finance_core::financing::rate_solver::detect_rate(
        parse_decimal("financedValue", &financed_value)?,
        installments,
        parse_decimal("installmentValue", &installment_value)?,
    );
    serde_json::to_string(&result).map_err(to_napi_error)
}

#[napi]
pub fn installment_for(
    financed_value: String,
    monthly_rate_percent: String,
    installments: u32,
) -> NapiResult<String> {
    let installment = solar_finance_core::financing::amortization::installment_for(
        parse_decimal("financedValue", &financed_value)?,
        parse_decimal("monthlyRatePercent", &monthly_rate_percent)?,
        installments,
    );
    Ok(installment.round_dp(2).to_string())
}

#[napi]
pub fn amortization_schedule(input_json: String) -> NapiResult<String> {
    let input: solar_finance_core::financing::amortization::AmortizationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = solar_finance_core::financing::amortization::amortization_schedule(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Savings
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_economy(input_json: String) -> NapiResult<String> {
    let input: solar_finance_core::savings::economy::EconomyInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        solar_finance_core::savings::economy::calculate_economy(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn calculate_payback(input_json: String) -> NapiResult<String> {
    let input: solar_finance_core::savings::payback::PaybackInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        solar_finance_core::savings::payback::calculate_payback(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn calculate_detailed_payback(input_json: String) -> NapiResult<String> {
    let input: solar_finance_core::savings::payback::DetailedPaybackInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = solar_finance_core::savings::payback::calculate_detailed_payback(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Sizing
// ---------------------------------------------------------------------------

#[napi]
pub fn size_system(input_json: String) -> NapiResult<String> {
    let input: solar_finance_core::sizing::solar::SizingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        solar_finance_core::sizing::solar::size_system(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn hsp_for_location(code: String) -> String {
    solar_finance_core::sizing::solar::hsp_for_location(&code).to_string()
}

#[napi]
pub fn reverse_sizing(input_json: String) -> NapiResult<String> {
    let input: solar_finance_core::sizing::reverse::ReverseCalcInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        solar_finance_core::sizing::reverse::run_reverse_sizing(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default engine configuration, as a starting point for overrides.
#[napi]
pub fn default_config() -> NapiResult<String> {
    serde_json::to_string(&EngineConfig::default()).map_err(to_napi_error)
}

/// Validate a (partial) configuration and return it with defaults filled in.
#[napi]
pub fn validate_config(config_json: String) -> NapiResult<String> {
    let config: EngineConfig = serde_json::from_str(&config_json).map_err(to_napi_error)?;
    config.validate().map_err(to_napi_error)?;
    serde_json::to_string(&config).map_err(to_napi_error)
}
