//! Budget-driven (reverse) system sizing.
//!
//! Starting from what a client spends on energy each month, finds the
//! system that budget can finance, the systems whose installment is covered
//! by their own saving, and the financing and cash alternatives for the
//! recommended system.
//!
//! Pricing is `fixed_cost + price_per_kwp * power` and a system's saving
//! stops growing once it covers the client's consumption, so installment is
//! increasing in power and cashflow is monotone on `[0, covering power]`.
//! Every inversion is a [`MonotoneSearch`] over power.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::{CandidateTerm, EngineConfig, ViabilityThresholds};
use crate::financing::amortization::installment_for;
use crate::financing::rate_solver::{classify_rate, detect_rate, RateSemaphore};
use crate::savings::economy::monthly_saving;
use crate::savings::payback::{simple_payback, PaybackResult, PROJECTION_HORIZON_MONTHS};
use crate::sizing::search::{MonotoneSearch, SearchOutcome};
use crate::sizing::solar::{
    generation_per_kwp, is_known_location, required_power, sizing_for_power, SizingResult,
    SolarResource, FALLBACK_HSP,
};
use crate::time_value::{compounded_savings, monthly_equivalent_rate, npv, MONTHS_PER_YEAR};
use crate::types::{with_metadata, ComputationOutput, Kwh, Kwp, Money, Percent};
use crate::SolarFinanceResult;

/// Smallest power considered by the scenario searches; a zero-sized system
/// trivially has zero cashflow.
const MIN_SCENARIO_POWER: Kwp = dec!(0.01);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseCalcInput {
    /// Monthly amount the client spends on energy and can commit
    pub monthly_budget: Money,
    pub tariff: Money,
    pub resource: SolarResource,
    /// Falls back to `config.default_compensation_factor`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation_factor: Option<Decimal>,
    #[serde(default)]
    pub config: EngineConfig,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Viability {
    Excellent,
    Good,
    Tight,
    Negative,
}

/// Which bound capped the recommended power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingConstraint {
    /// The installment at the representative term reached the budget
    Budget,
    /// The system already covers the client's consumption
    Consumption,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedSystem {
    #[serde(flatten)]
    pub sizing: SizingResult,
    pub monthly_consumption_kwh: Kwh,
    /// Expected generation as a share of consumption
    pub coverage_percent: Percent,
    pub limited_by: SizingConstraint,
    pub system_value: Money,
    pub monthly_saving: Money,
    /// Representative term used to size against the budget
    pub installments: u32,
    pub installment_value: Money,
    pub monthly_cashflow: Money,
}

/// A system sized to reach a target monthly cashflow at the scenario term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizedScenario {
    #[serde(flatten)]
    pub sizing: SizingResult,
    pub system_value: Money,
    pub installments: u32,
    pub monthly_rate_percent: Percent,
    pub installment_value: Money,
    pub monthly_saving: Money,
    pub monthly_cashflow: Money,
    pub target_cashflow: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenarios {
    /// Installment equals saving: the system pays for itself
    pub cashflow_zero: Option<SizedScenario>,
    /// Saving exceeds installment by the configured target
    pub cashflow_positive: Option<SizedScenario>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingOption {
    pub installments: u32,
    pub installment_value: Money,
    /// Monthly rate implied by the quoted installment, in percent
    pub estimated_rate: Percent,
    pub rate_semaphore: RateSemaphore,
    pub total_paid: Money,
    pub total_interest: Money,
    /// NPV of saving minus installment over 25 years
    pub net_present_value: Money,
    pub payback_years: Option<Decimal>,
    pub monthly_cashflow: Money,
    pub viability: Viability,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashOption {
    pub system_value: Money,
    pub discount_percent: Percent,
    pub cash_price: Money,
    pub payback: PaybackResult,
    pub payback_years: Option<Decimal>,
    /// With no installment the whole saving is cashflow
    pub monthly_cashflow: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTermProjection {
    pub horizon_months: u32,
    pub total_savings: Money,
    pub average_annual_savings: Money,
    pub investment: Money,
    /// `(total_savings - investment) / investment * 100`
    pub roi: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseCalcResult {
    pub recommendation: RecommendedSystem,
    pub scenarios: Scenarios,
    pub financing_options: Vec<FinancingOption>,
    pub cash_option: CashOption,
    pub long_term_projection: LongTermProjection,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Continuous economics of a system as a function of its power.
struct SystemModel<'a> {
    config: &'a EngineConfig,
    hsp: Decimal,
    tariff: Money,
    compensation_factor: Decimal,
    consumption: Kwh,
}

impl SystemModel<'_> {
    fn generation_per_kwp(&self) -> Kwh {
        generation_per_kwp(self.hsp, self.config.performance_factor)
    }

    /// Power whose generation matches consumption, unrounded.
    fn covering_power(&self) -> Kwp {
        let per_kwp = self.generation_per_kwp();
        if per_kwp.is_zero() {
            Decimal::ZERO
        } else {
            self.consumption / per_kwp
        }
    }

    /// Saving of a given generation; energy beyond consumption earns nothing.
    fn saving_for_generation(&self, generation: Kwh) -> Money {
        monthly_saving(
            generation.min(self.consumption),
            self.tariff,
            self.compensation_factor,
        )
    }

    fn raw_saving(&self, power: Kwp) -> Money {
        self.saving_for_generation(power * self.generation_per_kwp())
    }

    fn system_value(&self, power: Kwp) -> Money {
        self.config.pricing.system_value(power)
    }

    fn installment(&self, power: Kwp, term: &CandidateTerm) -> Money {
        installment_for(
            self.system_value(power),
            term.monthly_rate_percent,
            term.installments,
        )
    }

    fn raw_cashflow(&self, power: Kwp, term: &CandidateTerm) -> Money {
        self.raw_saving(power) - self.installment(power, term)
    }

    /// Saving of the reported (rounded) sizing.
    fn saving(&self, sizing: &SizingResult) -> Money {
        self.saving_for_generation(sizing.expected_generation_kwh)
    }

    fn sizing(&self, power: Kwp) -> SizingResult {
        sizing_for_power(power, self.hsp, self.config.performance_factor)
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Viability bucket of a monthly cashflow (saving minus installment).
pub fn classify_viability(monthly_cashflow: Money, thresholds: &ViabilityThresholds) -> Viability {
    if monthly_cashflow > thresholds.excellent_above {
        Viability::Excellent
    } else if monthly_cashflow >= Decimal::ZERO {
        Viability::Good
    } else if monthly_cashflow >= thresholds.tight_floor {
        Viability::Tight
    } else {
        Viability::Negative
    }
}

/// Size a system from a monthly budget and enumerate how to pay for it.
///
/// Only an invalid configuration is an error. A non-positive budget,
/// tariff, compensation factor or HSP produces an empty recommendation.
pub fn reverse_calculate(
    monthly_budget: Money,
    tariff: Money,
    resource: &SolarResource,
    compensation_factor: Decimal,
    config: &EngineConfig,
) -> SolarFinanceResult<ReverseCalcResult> {
    config.validate()?;

    let hsp = resource.hsp();
    let representative = CandidateTerm::new(
        config.financing.representative_installments,
        config
            .financing
            .rate_for(config.financing.representative_installments)
            .unwrap_or_default(),
    );

    if monthly_budget <= Decimal::ZERO
        || tariff <= Decimal::ZERO
        || compensation_factor <= Decimal::ZERO
        || hsp <= Decimal::ZERO
    {
        tracing::debug!(
            budget = %monthly_budget,
            tariff = %tariff,
            hsp = %hsp,
            "degenerate reverse sizing input"
        );
        return Ok(empty_result(hsp, &representative, config));
    }

    let model = SystemModel {
        config,
        hsp,
        tariff,
        compensation_factor,
        consumption: monthly_budget / tariff,
    };

    let recommendation = recommend(&model, monthly_budget, &representative);
    let scenarios = Scenarios {
        cashflow_zero: scenario(&model, Decimal::ZERO),
        cashflow_positive: scenario(&model, config.positive_cashflow_target),
    };

    let saving = recommendation.monthly_saving;
    let value = recommendation.system_value;

    let financing_options = if value > Decimal::ZERO {
        config
            .financing
            .candidate_terms
            .iter()
            .map(|term| financing_option(value, saving, term, config))
            .collect::<SolarFinanceResult<Vec<_>>>()?
    } else {
        Vec::new()
    };

    Ok(ReverseCalcResult {
        cash_option: cash_option(value, saving, config),
        long_term_projection: long_term_projection(value, saving, config),
        recommendation,
        scenarios,
        financing_options,
    })
}

fn recommend(
    model: &SystemModel<'_>,
    monthly_budget: Money,
    representative: &CandidateTerm,
) -> RecommendedSystem {
    let config = model.config;

    // Largest power whose installment fits the budget
    let search = MonotoneSearch::new(Decimal::ZERO, config.max_power_kwp);
    let budget_power = match search.solve(|p| model.installment(p, representative), monthly_budget) {
        SearchOutcome::Found { x_below, .. } => x_below,
        SearchOutcome::NotBracketed { .. } => config.max_power_kwp,
    }
    .round_dp_with_strategy(2, RoundingStrategy::ToZero);

    let covering = required_power(model.consumption, model.hsp, config.performance_factor);
    let (power, limited_by) = if budget_power < covering {
        (budget_power, SizingConstraint::Budget)
    } else {
        (covering, SizingConstraint::Consumption)
    };

    let sizing = model.sizing(power);
    let system_value = model.system_value(sizing.recommended_power_kwp);
    let saving = model.saving(&sizing);
    let installment = model
        .installment(sizing.recommended_power_kwp, representative)
        .round_dp(2);
    let coverage_percent = if model.consumption.is_zero() {
        Decimal::ZERO
    } else {
        (sizing.expected_generation_kwh / model.consumption * dec!(100)).round_dp(2)
    };

    RecommendedSystem {
        sizing,
        monthly_consumption_kwh: model.consumption.round_dp(2),
        coverage_percent,
        limited_by,
        system_value,
        monthly_saving: saving,
        installments: representative.installments,
        installment_value: installment,
        monthly_cashflow: saving - installment,
    }
}

/// Smallest useful system reaching `target` cashflow at the scenario term.
fn scenario(model: &SystemModel<'_>, target: Money) -> Option<SizedScenario> {
    let config = model.config;
    let installments = config.financing.scenario_installments;
    let rate = config.financing.rate_for(installments)?;
    let term = CandidateTerm::new(installments, rate);

    let upper = model.covering_power().min(config.max_power_kwp);
    if upper <= MIN_SCENARIO_POWER {
        return None;
    }

    let search = MonotoneSearch::new(MIN_SCENARIO_POWER, upper);
    let power = match search.solve(|p| model.raw_cashflow(p, &term), target) {
        SearchOutcome::Found { x, .. } => x,
        SearchOutcome::NotBracketed { at_lower, at_upper } => {
            tracing::debug!(
                cashflow_target = %target,
                installments,
                at_lower = %at_lower,
                at_upper = %at_upper,
                "no system size reaches the target cashflow"
            );
            return None;
        }
    };

    let sizing = model.sizing(power);
    if sizing.recommended_power_kwp <= Decimal::ZERO {
        return None;
    }
    let saving = model.saving(&sizing);
    let installment = model
        .installment(sizing.recommended_power_kwp, &term)
        .round_dp(2);

    Some(SizedScenario {
        system_value: model.system_value(sizing.recommended_power_kwp),
        sizing,
        installments,
        monthly_rate_percent: rate,
        installment_value: installment,
        monthly_saving: saving,
        monthly_cashflow: saving - installment,
        target_cashflow: target,
    })
}

fn financing_option(
    system_value: Money,
    saving: Money,
    term: &CandidateTerm,
    config: &EngineConfig,
) -> SolarFinanceResult<FinancingOption> {
    let installment =
        installment_for(system_value, term.monthly_rate_percent, term.installments).round_dp(2);
    let detected = detect_rate(system_value, term.installments, installment);
    let total_paid = installment * Decimal::from(term.installments);

    // Month 0 carries no flow: the whole price is financed
    let growth = monthly_equivalent_rate(config.annual_tariff_increase_percent);
    let discount = monthly_equivalent_rate(config.financing.discount_rate_annual_percent);
    let mut flows = Vec::with_capacity(PROJECTION_HORIZON_MONTHS as usize + 1);
    flows.push(Decimal::ZERO);
    let mut month_saving = saving;
    for month in 1..=PROJECTION_HORIZON_MONTHS {
        let payment = if month <= term.installments {
            installment
        } else {
            Decimal::ZERO
        };
        flows.push(month_saving - payment);
        month_saving *= Decimal::ONE + growth;
    }
    let net_present_value = npv(discount, &flows)?.round_dp(2);

    let monthly_cashflow = saving - installment;
    let estimated_rate = detected.monthly_rate_percent.round_dp(4);

    Ok(FinancingOption {
        installments: term.installments,
        installment_value: installment,
        estimated_rate,
        rate_semaphore: classify_rate(estimated_rate),
        total_paid,
        total_interest: (total_paid - system_value).max(Decimal::ZERO),
        net_present_value,
        payback_years: simple_payback(total_paid, saving, config.annual_tariff_increase_percent)
            .years,
        monthly_cashflow,
        viability: classify_viability(monthly_cashflow, &config.viability),
    })
}

fn cash_option(system_value: Money, saving: Money, config: &EngineConfig) -> CashOption {
    let cash_price =
        (system_value * (Decimal::ONE - config.cash_discount_percent / dec!(100))).round_dp(2);
    let payback = simple_payback(cash_price, saving, config.annual_tariff_increase_percent);
    CashOption {
        system_value,
        discount_percent: config.cash_discount_percent,
        cash_price,
        payback_years: payback.years,
        payback,
        monthly_cashflow: saving,
    }
}

fn long_term_projection(investment: Money, saving: Money, config: &EngineConfig) -> LongTermProjection {
    let growth = monthly_equivalent_rate(config.annual_tariff_increase_percent);
    let total_savings =
        compounded_savings(saving, growth, PROJECTION_HORIZON_MONTHS).round_dp(2);
    let years = Decimal::from(PROJECTION_HORIZON_MONTHS / MONTHS_PER_YEAR);
    let roi = if investment > Decimal::ZERO {
        ((total_savings - investment) / investment * dec!(100)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    LongTermProjection {
        horizon_months: PROJECTION_HORIZON_MONTHS,
        total_savings,
        average_annual_savings: (total_savings / years).round_dp(2),
        investment,
        roi,
    }
}

fn empty_result(hsp: Decimal, representative: &CandidateTerm, config: &EngineConfig) -> ReverseCalcResult {
    let hsp_used = if hsp > Decimal::ZERO { hsp } else { FALLBACK_HSP };
    ReverseCalcResult {
        recommendation: RecommendedSystem {
            sizing: sizing_for_power(Decimal::ZERO, hsp_used, config.performance_factor),
            monthly_consumption_kwh: Decimal::ZERO,
            coverage_percent: Decimal::ZERO,
            limited_by: SizingConstraint::Budget,
            system_value: Decimal::ZERO,
            monthly_saving: Decimal::ZERO,
            installments: representative.installments,
            installment_value: Decimal::ZERO,
            monthly_cashflow: Decimal::ZERO,
        },
        scenarios: Scenarios {
            cashflow_zero: None,
            cashflow_positive: None,
        },
        financing_options: Vec::new(),
        cash_option: cash_option(Decimal::ZERO, Decimal::ZERO, config),
        long_term_projection: long_term_projection(Decimal::ZERO, Decimal::ZERO, config),
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

pub fn run_reverse_sizing(
    input: &ReverseCalcInput,
) -> SolarFinanceResult<ComputationOutput<ReverseCalcResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let config = &input.config;
    let factor = input
        .compensation_factor
        .unwrap_or(config.default_compensation_factor);

    if let SolarResource::Location(code) = &input.resource {
        if !is_known_location(code) {
            warnings.push(format!("Unknown location '{code}'; using fallback HSP {FALLBACK_HSP}"));
        }
    }
    if input.monthly_budget <= Decimal::ZERO {
        warnings.push("Monthly budget is not positive; nothing to size".into());
    }
    if input.tariff <= Decimal::ZERO {
        warnings.push("Tariff is not positive; nothing to size".into());
    }
    if factor <= Decimal::ZERO || factor > Decimal::ONE {
        warnings.push(format!("Compensation factor {factor} is outside (0, 1]"));
    }

    let result = reverse_calculate(
        input.monthly_budget,
        input.tariff,
        &input.resource,
        factor,
        config,
    )?;

    let rec = &result.recommendation;
    if input.monthly_budget > Decimal::ZERO
        && input.tariff > Decimal::ZERO
        && rec.sizing.recommended_power_kwp.is_zero()
    {
        warnings.push("Budget does not cover the installment of the smallest system".into());
    }
    if rec.sizing.recommended_power_kwp >= config.max_power_kwp {
        warnings.push(format!(
            "Recommendation capped at the maximum searched power of {} kWp",
            config.max_power_kwp
        ));
    }
    if rec.system_value > Decimal::ZERO {
        if result.scenarios.cashflow_zero.is_none() {
            warnings.push(format!(
                "No system size breaks even at {} installments",
                config.financing.scenario_installments
            ));
        }
        if result.scenarios.cashflow_positive.is_none() {
            warnings.push(format!(
                "No system size reaches a monthly surplus of {} at {} installments",
                config.positive_cashflow_target, config.financing.scenario_installments
            ));
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Reverse sizing by bisection over system power; Price-table financing; \
         savings compounded at the monthly equivalent of the tariff increase",
        input,
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
