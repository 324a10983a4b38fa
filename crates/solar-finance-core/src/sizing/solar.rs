//! Photovoltaic sizing from peak sun hours (HSP).
//!
//! `power = consumption / (hsp * performance_factor * 30)` and its inverse
//! `generation = power * hsp * performance_factor * 30`. Power is reported
//! to two decimals and generation to whole kWh.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::DEFAULT_PERFORMANCE_FACTOR;
use crate::error::SolarFinanceError;
use crate::types::{with_metadata, ComputationOutput, Kwh, Kwp};
use crate::SolarFinanceResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Days per month used by the generation formulas.
pub const DAYS_PER_MONTH: Decimal = dec!(30);

/// HSP used when a location is not in the table.
pub const FALLBACK_HSP: Decimal = dec!(4.5);

/// Average daily peak sun hours per Brazilian federative unit.
const HSP_BY_LOCATION: &[(&str, Decimal)] = &[
    ("AC", dec!(4.6)),
    ("AL", dec!(5.5)),
    ("AM", dec!(4.5)),
    ("AP", dec!(4.9)),
    ("BA", dec!(5.6)),
    ("CE", dec!(5.6)),
    ("DF", dec!(5.3)),
    ("ES", dec!(5.0)),
    ("GO", dec!(5.3)),
    ("MA", dec!(5.2)),
    ("MG", dec!(5.4)),
    ("MS", dec!(5.2)),
    ("MT", dec!(5.2)),
    ("PA", dec!(4.9)),
    ("PB", dec!(5.6)),
    ("PE", dec!(5.5)),
    ("PI", dec!(5.6)),
    ("PR", dec!(4.7)),
    ("RJ", dec!(5.0)),
    ("RN", dec!(5.7)),
    ("RO", dec!(4.7)),
    ("RR", dec!(4.8)),
    ("RS", dec!(4.6)),
    ("SC", dec!(4.4)),
    ("SE", dec!(5.4)),
    ("SP", dec!(4.9)),
    ("TO", dec!(5.4)),
];

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

/// Where the solar resource figure comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolarResource {
    /// Explicit peak sun hours
    Hsp(Decimal),
    /// Location code looked up in the HSP table
    Location(String),
}

impl SolarResource {
    pub fn hsp(&self) -> Decimal {
        match self {
            SolarResource::Hsp(h) => *h,
            SolarResource::Location(code) => hsp_for_location(code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingResult {
    pub recommended_power_kwp: Kwp,
    pub expected_generation_kwh: Kwh,
    pub hsp_used: Decimal,
}

/// Physical module arrangement for a target power.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleLayout {
    pub module_count: u32,
    pub module_watt_peak: Decimal,
    /// Power actually installed with whole modules
    pub installed_power_kwp: Kwp,
    pub roof_area_m2: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingInput {
    pub monthly_consumption_kwh: Kwh,
    pub resource: SolarResource,
    #[serde(default = "default_performance_factor")]
    pub performance_factor: Decimal,
    /// Module nameplate power; when present a layout is included
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_watt_peak: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_area_m2: Option<Decimal>,
}

fn default_performance_factor() -> Decimal {
    DEFAULT_PERFORMANCE_FACTOR
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingOutput {
    pub sizing: SizingResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<ModuleLayout>,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// HSP for a location code (case-insensitive), or [`FALLBACK_HSP`].
pub fn hsp_for_location(code: &str) -> Decimal {
    let code = code.trim();
    HSP_BY_LOCATION
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, h)| *h)
        .unwrap_or(FALLBACK_HSP)
}

/// Whether `code` is in the HSP table.
pub fn is_known_location(code: &str) -> bool {
    let code = code.trim();
    HSP_BY_LOCATION.iter().any(|(c, _)| c.eq_ignore_ascii_case(code))
}

/// Monthly kWh produced by 1 kWp.
pub fn generation_per_kwp(hsp: Decimal, performance_factor: Decimal) -> Kwh {
    if hsp <= Decimal::ZERO || performance_factor <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    hsp * performance_factor * DAYS_PER_MONTH
}

/// kWp needed to generate `monthly_consumption_kwh`, to two decimals.
pub fn required_power(monthly_consumption_kwh: Kwh, hsp: Decimal, performance_factor: Decimal) -> Kwp {
    let per_kwp = generation_per_kwp(hsp, performance_factor);
    if monthly_consumption_kwh <= Decimal::ZERO || per_kwp.is_zero() {
        return Decimal::ZERO;
    }
    (monthly_consumption_kwh / per_kwp).round_dp(2)
}

/// Monthly kWh generated by `power_kwp`, to the whole kWh.
pub fn expected_generation(power_kwp: Kwp, hsp: Decimal, performance_factor: Decimal) -> Kwh {
    if power_kwp <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (power_kwp * generation_per_kwp(hsp, performance_factor)).round_dp(0)
}

/// Sizing result for a given power. Generation is always derived from the
/// reported power so the pair is consistent.
pub fn sizing_for_power(power_kwp: Kwp, hsp: Decimal, performance_factor: Decimal) -> SizingResult {
    let power = power_kwp.max(Decimal::ZERO).round_dp(2);
    SizingResult {
        recommended_power_kwp: power,
        expected_generation_kwh: expected_generation(power, hsp, performance_factor),
        hsp_used: hsp,
    }
}

pub fn size_for_consumption(
    monthly_consumption_kwh: Kwh,
    hsp: Decimal,
    performance_factor: Decimal,
) -> SizingResult {
    let power = required_power(monthly_consumption_kwh, hsp, performance_factor);
    sizing_for_power(power, hsp, performance_factor)
}

/// Whole modules needed to reach `power_kwp`.
pub fn module_layout(
    power_kwp: Kwp,
    module_watt_peak: Decimal,
    module_area_m2: Decimal,
) -> SolarFinanceResult<ModuleLayout> {
    if module_watt_peak <= Decimal::ZERO {
        return Err(SolarFinanceError::InvalidInput {
            field: "module_watt_peak".into(),
            reason: "must be positive".into(),
        });
    }
    if module_area_m2 < Decimal::ZERO {
        return Err(SolarFinanceError::InvalidInput {
            field: "module_area_m2".into(),
            reason: "cannot be negative".into(),
        });
    }

    let count = if power_kwp <= Decimal::ZERO {
        0
    } else {
        (power_kwp * dec!(1000) / module_watt_peak)
            .ceil()
            .to_u32()
            .ok_or_else(|| SolarFinanceError::InvalidInput {
                field: "power_kwp".into(),
                reason: "too many modules".into(),
            })?
    };
    let count_dec = Decimal::from(count);

    Ok(ModuleLayout {
        module_count: count,
        module_watt_peak,
        installed_power_kwp: count_dec * module_watt_peak / dec!(1000),
        roof_area_m2: count_dec * module_area_m2,
    })
}

/// Default module used when only the wattage is known.
const DEFAULT_MODULE_AREA_M2: Decimal = dec!(2.6);

pub fn size_system(input: &SizingInput) -> SolarFinanceResult<ComputationOutput<SizingOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.performance_factor <= Decimal::ZERO || input.performance_factor > Decimal::ONE {
        return Err(SolarFinanceError::InvalidInput {
            field: "performance_factor".into(),
            reason: "must be in (0, 1]".into(),
        });
    }

    let hsp = input.resource.hsp();
    if let SolarResource::Location(code) = &input.resource {
        if !is_known_location(code) {
            warnings.push(format!("Unknown location '{code}'; using fallback HSP {FALLBACK_HSP}"));
        }
    }
    if hsp <= Decimal::ZERO {
        warnings.push("HSP is not positive; no system can be sized".into());
    }
    if input.monthly_consumption_kwh <= Decimal::ZERO {
        warnings.push("Consumption is not positive; no system needed".into());
    }

    let sizing = size_for_consumption(input.monthly_consumption_kwh, hsp, input.performance_factor);
    let layout = match input.module_watt_peak {
        Some(wp) => Some(module_layout(
            sizing.recommended_power_kwp,
            wp,
            input.module_area_m2.unwrap_or(DEFAULT_MODULE_AREA_M2),
        )?),
        None => None,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Consumption / (HSP x performance factor x 30 days)",
        input,
        warnings,
        elapsed,
        SizingOutput { sizing, layout },
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
