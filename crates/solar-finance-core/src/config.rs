//! Engine configuration.
//!
//! Every business constant the engine relies on (performance factor,
//! pricing, loan terms offered, viability thresholds, cash discount) lives
//! here so deployments can tune them without touching the formulas. All
//! sections deserialize with defaults, so a partial JSON/YAML document only
//! needs the fields it overrides.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SolarFinanceError;
use crate::types::{Kwp, Money, Percent};
use crate::SolarFinanceResult;

/// Default system performance factor (losses from heat, wiring, inverter).
pub const DEFAULT_PERFORMANCE_FACTOR: Decimal = dec!(0.80);

/// Default regulatory compensation factor.
pub const DEFAULT_COMPENSATION_FACTOR: Decimal = dec!(0.85);

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Turnkey price of a system as a function of its power.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Variable cost per installed kWp (modules, inverter, structure)
    pub price_per_kwp: Money,
    /// Fixed cost per project (engineering, permitting, mobilization)
    pub fixed_cost: Money,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            price_per_kwp: dec!(3200),
            fixed_cost: dec!(2000),
        }
    }
}

impl PricingConfig {
    /// `fixed_cost + price_per_kwp * power`, or zero for an empty system.
    pub fn system_value(&self, power_kwp: Kwp) -> Money {
        if power_kwp <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.fixed_cost + self.price_per_kwp * power_kwp
    }
}

/// A loan term the partner banks offer, with its quoted monthly rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTerm {
    pub installments: u32,
    pub monthly_rate_percent: Percent,
}

impl CandidateTerm {
    pub fn new(installments: u32, monthly_rate_percent: Percent) -> Self {
        Self {
            installments,
            monthly_rate_percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancingConfig {
    /// Terms enumerated as financing options, in display order
    pub candidate_terms: Vec<CandidateTerm>,
    /// Term used to turn the budget into an affordable system
    pub representative_installments: u32,
    /// Term used to size the cashflow-zero / cashflow-positive scenarios
    pub scenario_installments: u32,
    /// Annual discount rate for the net present value of each option
    pub discount_rate_annual_percent: Percent,
}

impl Default for FinancingConfig {
    fn default() -> Self {
        Self {
            candidate_terms: vec![
                CandidateTerm::new(36, dec!(1.49)),
                CandidateTerm::new(48, dec!(1.59)),
                CandidateTerm::new(60, dec!(1.69)),
                CandidateTerm::new(72, dec!(1.79)),
                CandidateTerm::new(84, dec!(1.89)),
                CandidateTerm::new(96, dec!(1.99)),
                CandidateTerm::new(120, dec!(2.09)),
            ],
            representative_installments: 60,
            scenario_installments: 120,
            discount_rate_annual_percent: dec!(12),
        }
    }
}

impl FinancingConfig {
    /// Quoted monthly rate for a configured term.
    pub fn rate_for(&self, installments: u32) -> Option<Percent> {
        self.candidate_terms
            .iter()
            .find(|t| t.installments == installments)
            .map(|t| t.monthly_rate_percent)
    }
}

/// Monthly cashflow boundaries between viability buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViabilityThresholds {
    /// Surplus strictly above this is excellent
    pub excellent_above: Money,
    /// Outlays down to this floor (inclusive) are tight; below is negative
    pub tight_floor: Money,
}

impl Default for ViabilityThresholds {
    fn default() -> Self {
        Self {
            excellent_above: dec!(100),
            tight_floor: dec!(-100),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub performance_factor: Decimal,
    /// Used when a caller does not supply its own factor
    pub default_compensation_factor: Decimal,
    /// Expected yearly tariff inflation
    pub annual_tariff_increase_percent: Percent,
    /// Surplus the cashflow-positive scenario aims for
    pub positive_cashflow_target: Money,
    /// Discount granted for full upfront payment
    pub cash_discount_percent: Percent,
    /// Upper bound of the power search
    pub max_power_kwp: Kwp,
    pub pricing: PricingConfig,
    pub financing: FinancingConfig,
    pub viability: ViabilityThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            performance_factor: DEFAULT_PERFORMANCE_FACTOR,
            default_compensation_factor: DEFAULT_COMPENSATION_FACTOR,
            annual_tariff_increase_percent: dec!(6),
            positive_cashflow_target: dec!(100),
            cash_discount_percent: dec!(5),
            max_power_kwp: dec!(1000),
            pricing: PricingConfig::default(),
            financing: FinancingConfig::default(),
            viability: ViabilityThresholds::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> SolarFinanceResult<()> {
        if self.performance_factor <= Decimal::ZERO || self.performance_factor > Decimal::ONE {
            return Err(invalid("performance_factor", "must be in (0, 1]"));
        }
        if self.default_compensation_factor <= Decimal::ZERO
            || self.default_compensation_factor > Decimal::ONE
        {
            return Err(invalid("default_compensation_factor", "must be in (0, 1]"));
        }
        if self.annual_tariff_increase_percent <= dec!(-100) {
            return Err(invalid(
                "annual_tariff_increase_percent",
                "must be greater than -100%",
            ));
        }
        if self.cash_discount_percent < Decimal::ZERO || self.cash_discount_percent >= dec!(100) {
            return Err(invalid("cash_discount_percent", "must be in [0, 100)"));
        }
        if self.max_power_kwp <= Decimal::ZERO {
            return Err(invalid("max_power_kwp", "must be positive"));
        }
        if self.pricing.price_per_kwp <= Decimal::ZERO {
            return Err(invalid("pricing.price_per_kwp", "must be positive"));
        }
        if self.pricing.fixed_cost < Decimal::ZERO {
            return Err(invalid("pricing.fixed_cost", "cannot be negative"));
        }

        let fin = &self.financing;
        if fin.candidate_terms.is_empty() {
            return Err(invalid("financing.candidate_terms", "at least one term is required"));
        }
        for term in &fin.candidate_terms {
            if term.installments == 0 {
                return Err(invalid("financing.candidate_terms", "installments must be > 0"));
            }
            if term.monthly_rate_percent < Decimal::ZERO {
                return Err(invalid(
                    "financing.candidate_terms",
                    "monthly rate cannot be negative",
                ));
            }
        }
        if fin.rate_for(fin.representative_installments).is_none() {
            return Err(invalid(
                "financing.representative_installments",
                "must be one of the candidate terms",
            ));
        }
        if fin.rate_for(fin.scenario_installments).is_none() {
            return Err(invalid(
                "financing.scenario_installments",
                "must be one of the candidate terms",
            ));
        }
        if fin.discount_rate_annual_percent <= dec!(-100) {
            return Err(invalid(
                "financing.discount_rate_annual_percent",
                "must be greater than -100%",
            ));
        }

        if self.viability.tight_floor > Decimal::ZERO
            || self.viability.excellent_above < Decimal::ZERO
        {
            return Err(invalid(
                "viability",
                "tight_floor must be <= 0 <= excellent_above",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> SolarFinanceError {
    SolarFinanceError::InvalidConfig {
        field: field.into(),
        reason: reason.into(),
    }
}
