//! Payback projection under compounding tariff inflation.
//!
//! Savings grow every month by the monthly equivalent of the annual tariff
//! increase. Payback that is not reached within the horizon is reported as
//! `None` ("not applicable") rather than as a number.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::time_value::{monthly_equivalent_rate, MONTHS_PER_YEAR};
use crate::types::{months_to_years, with_metadata, ComputationOutput, Money, Percent};
use crate::SolarFinanceResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Simple payback gives up after 50 years.
pub const PAYBACK_HORIZON_MONTHS: u32 = 600;

/// Detailed projections and long-term figures cover 25 years.
pub const PROJECTION_HORIZON_MONTHS: u32 = 300;

const NOT_APPLICABLE_LABEL: &str = "Not applicable";

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaybackInput {
    pub total_cost: Money,
    pub monthly_saving: Money,
    #[serde(default)]
    pub annual_tariff_increase_percent: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedPaybackInput {
    pub system_value: Money,
    pub installment_value: Money,
    /// Zero for a cash purchase
    pub installments: u32,
    pub monthly_saving: Money,
    #[serde(default)]
    pub annual_tariff_increase_percent: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaybackResult {
    /// `None` when the cost is never recovered
    pub months: Option<u32>,
    pub years: Option<Decimal>,
    pub display_label: String,
}

impl PaybackResult {
    pub fn unreachable() -> Self {
        Self {
            months: None,
            years: None,
            display_label: NOT_APPLICABLE_LABEL.to_string(),
        }
    }

    pub fn from_months(months: u32) -> Self {
        Self {
            months: Some(months),
            years: Some(months_to_years(months)),
            display_label: payback_label(months),
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.months.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionPhase {
    Financing,
    PostFinancing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyProjection {
    pub month: u32,
    pub phase: ProjectionPhase,
    pub saving: Money,
    /// Installment, or the full price in month 1 of a cash purchase
    pub payment: Money,
    pub net_cashflow: Money,
    pub accumulated_savings: Money,
    pub accumulated_cost: Money,
    /// accumulated_savings - accumulated_cost
    pub cumulative_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlySummary {
    pub year: u32,
    pub savings: Money,
    pub payments: Money,
    pub net_cashflow: Money,
    pub cumulative_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedPaybackResult {
    /// Payback against the total actually paid, interest included
    #[serde(flatten)]
    pub payback: PaybackResult,
    pub total_paid: Money,
    pub net_savings_after_horizon: Money,
    /// First month where accumulated savings cover accumulated payments
    pub break_even_month: Option<u32>,
    /// Saving in the first month after the last installment
    pub post_financing_monthly_saving: Option<Money>,
    pub monthly_projection: Vec<MonthlyProjection>,
    pub yearly_summary: Vec<YearlySummary>,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// "2 years and 3 months", "5 years", "7 months".
pub fn payback_label(months: u32) -> String {
    let years = months / MONTHS_PER_YEAR;
    let remainder = months % MONTHS_PER_YEAR;
    match (years, remainder) {
        (0, m) => count_label(m, "month", "months"),
        (y, 0) => count_label(y, "year", "years"),
        (y, m) => format!(
            "{} and {}",
            count_label(y, "year", "years"),
            count_label(m, "month", "months")
        ),
    }
}

fn count_label(count: u32, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Months until accumulated savings reach `total_cost`.
///
/// With a zero increase this is `ceil(total_cost / monthly_saving)`;
/// otherwise the saving compounds monthly. Anything beyond 600 months, a
/// non-positive cost or a non-positive saving is unreachable.
pub fn simple_payback(
    total_cost: Money,
    monthly_saving: Money,
    annual_tariff_increase_percent: Percent,
) -> PaybackResult {
    if monthly_saving <= Decimal::ZERO || total_cost <= Decimal::ZERO {
        return PaybackResult::unreachable();
    }

    if annual_tariff_increase_percent.is_zero() {
        let months = (total_cost / monthly_saving).ceil();
        if months > Decimal::from(PAYBACK_HORIZON_MONTHS) {
            return PaybackResult::unreachable();
        }
        return match months.to_u32() {
            Some(m) => PaybackResult::from_months(m),
            None => PaybackResult::unreachable(),
        };
    }

    let growth = monthly_equivalent_rate(annual_tariff_increase_percent);
    let mut accumulated = Decimal::ZERO;
    let mut saving = monthly_saving;
    for month in 1..=PAYBACK_HORIZON_MONTHS {
        accumulated += saving;
        if accumulated >= total_cost {
            return PaybackResult::from_months(month);
        }
        saving *= Decimal::ONE + growth;
    }

    PaybackResult::unreachable()
}

/// Month-by-month projection over 25 years of a financed (or cash)
/// purchase.
///
/// The installment is charged while the month is within the financing
/// term; with `installments == 0` the whole `system_value` is charged in
/// month 1. The headline payback is measured against the total actually
/// paid.
pub fn detailed_payback(
    system_value: Money,
    installment_value: Money,
    installments: u32,
    monthly_saving: Money,
    annual_tariff_increase_percent: Percent,
) -> DetailedPaybackResult {
    let financed = installments > 0 && installment_value > Decimal::ZERO;
    let term = if financed { installments } else { 0 };
    let total_paid = if financed {
        installment_value * Decimal::from(installments)
    } else {
        system_value.max(Decimal::ZERO)
    };

    let growth = monthly_equivalent_rate(annual_tariff_increase_percent);
    let mut saving = monthly_saving.max(Decimal::ZERO);
    let mut accumulated_savings = Decimal::ZERO;
    let mut accumulated_cost = Decimal::ZERO;
    let mut break_even_month = None;
    let mut post_financing_monthly_saving = None;

    let mut monthly_projection = Vec::with_capacity(PROJECTION_HORIZON_MONTHS as usize);
    let mut yearly_summary = Vec::with_capacity((PROJECTION_HORIZON_MONTHS / MONTHS_PER_YEAR) as usize);
    let mut year_savings = Decimal::ZERO;
    let mut year_payments = Decimal::ZERO;

    for month in 1..=PROJECTION_HORIZON_MONTHS {
        let (phase, payment) = if month <= term {
            (ProjectionPhase::Financing, installment_value)
        } else if !financed && month == 1 {
            (ProjectionPhase::PostFinancing, total_paid)
        } else {
            (ProjectionPhase::PostFinancing, Decimal::ZERO)
        };
        if financed && month == term + 1 {
            post_financing_monthly_saving = Some(saving);
        }

        accumulated_savings += saving;
        accumulated_cost += payment;
        if break_even_month.is_none() && accumulated_savings >= accumulated_cost {
            break_even_month = Some(month);
        }

        monthly_projection.push(MonthlyProjection {
            month,
            phase,
            saving,
            payment,
            net_cashflow: saving - payment,
            accumulated_savings,
            accumulated_cost,
            cumulative_balance: accumulated_savings - accumulated_cost,
        });

        year_savings += saving;
        year_payments += payment;
        if month % MONTHS_PER_YEAR == 0 {
            yearly_summary.push(YearlySummary {
                year: month / MONTHS_PER_YEAR,
                savings: year_savings,
                payments: year_payments,
                net_cashflow: year_savings - year_payments,
                cumulative_balance: accumulated_savings - accumulated_cost,
            });
            year_savings = Decimal::ZERO;
            year_payments = Decimal::ZERO;
        }

        saving *= Decimal::ONE + growth;
    }

    DetailedPaybackResult {
        payback: simple_payback(total_paid, monthly_saving, annual_tariff_increase_percent),
        total_paid,
        net_savings_after_horizon: accumulated_savings - total_paid,
        break_even_month,
        post_financing_monthly_saving,
        monthly_projection,
        yearly_summary,
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

pub fn calculate_payback(input: &PaybackInput) -> SolarFinanceResult<ComputationOutput<PaybackResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = simple_payback(
        input.total_cost,
        input.monthly_saving,
        input.annual_tariff_increase_percent,
    );
    if !result.is_reachable() {
        warnings.push(unreachable_reason(input.total_cost, input.monthly_saving));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Simple payback with monthly-compounded tariff increase (600-month cap)",
        input,
        warnings,
        elapsed,
        result,
    ))
}

pub fn calculate_detailed_payback(
    input: &DetailedPaybackInput,
) -> SolarFinanceResult<ComputationOutput<DetailedPaybackResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.installments == 0 || input.installment_value <= Decimal::ZERO {
        warnings.push("No installments given; projected as a cash purchase".into());
    }

    let result = detailed_payback(
        input.system_value,
        input.installment_value,
        input.installments,
        input.monthly_saving,
        input.annual_tariff_increase_percent,
    );
    if !result.payback.is_reachable() {
        warnings.push(unreachable_reason(result.total_paid, input.monthly_saving));
    }
    if result.break_even_month.is_none() {
        warnings.push("Accumulated savings never cover accumulated payments within 25 years".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "25-year monthly projection; payback against total paid including interest",
        input,
        warnings,
        elapsed,
        result,
    ))
}

fn unreachable_reason(total_cost: Money, monthly_saving: Money) -> String {
    if monthly_saving <= Decimal::ZERO {
        "Monthly saving is not positive; payback not applicable".into()
    } else if total_cost <= Decimal::ZERO {
        "Total cost is not positive; payback not applicable".into()
    } else {
        format!("Cost not recovered within {PAYBACK_HORIZON_MONTHS} months; payback not applicable")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_exact_years() {
        let r = simple_payback(dec!(30000), dec!(500), Decimal::ZERO);
        assert_eq!(r.months, Some(60));
        assert_eq!(r.years, Some(dec!(5)));
        assert_eq!(r.display_label, "5 years");
    }

    #[test]
    fn test_years_and_months() {
        let r = simple_payback(dec!(31000), dec!(500), Decimal::ZERO);
        assert_eq!(r.months, Some(62));
        assert_eq!(r.display_label, "5 years and 2 months");
    }

    #[test]
    fn test_labels() {
        assert_eq!(payback_label(7), "7 months");
        assert_eq!(payback_label(1), "1 month");
        assert_eq!(payback_label(12), "1 year");
        assert_eq!(payback_label(13), "1 year and 1 month");
        assert_eq!(payback_label(26), "2 years and 2 months");
    }

    #[test]
    fn test_unreachable_inputs() {
        assert_eq!(simple_payback(dec!(30000), Decimal::ZERO, dec!(5)), PaybackResult::unreachable());
        assert_eq!(simple_payback(Decimal::ZERO, dec!(500), dec!(5)), PaybackResult::unreachable());
        assert_eq!(simple_payback(dec!(30000), dec!(-1), Decimal::ZERO), PaybackResult::unreachable());
    }

    #[test]
    fn test_beyond_fifty_years_is_unreachable() {
        // 601 months at 0%
        let r = simple_payback(dec!(60100), dec!(100), Decimal::ZERO);
        assert!(!r.is_reachable());
        assert_eq!(r.display_label, "Not applicable");
        // Exactly 600 months is still reachable
        assert_eq!(simple_payback(dec!(60000), dec!(100), Decimal::ZERO).months, Some(600));
    }

    #[test]
    fn test_tariff_increase_shortens_payback() {
        let flat = simple_payback(dec!(30000), dec!(500), Decimal::ZERO);
        let growing = simple_payback(dec!(30000), dec!(500), dec!(8));
        assert!(growing.months.unwrap() < flat.months.unwrap());
    }

    #[test]
    fn test_growth_rescues_long_payback() {
        // 1000 months flat, but 10% a year growth recovers it well within 50 years
        let r = simple_payback(dec!(100000), dec!(100), dec!(10));
        assert!(r.is_reachable());
    }

    #[test]
    fn test_detailed_break_even_and_totals() {
        // Saving equals the installment: break-even in month 1
        let r = detailed_payback(dec!(20000), dec!(500), 60, dec!(500), Decimal::ZERO);
        assert_eq!(r.total_paid, dec!(30000));
        assert_eq!(r.break_even_month, Some(1));
        assert_eq!(r.payback.months, Some(60));
        assert_eq!(r.net_savings_after_horizon, dec!(150000) - dec!(30000));
        assert_eq!(r.monthly_projection.len(), 300);
        assert_eq!(r.yearly_summary.len(), 25);
        assert_eq!(r.post_financing_monthly_saving, Some(dec!(500)));
    }

    #[test]
    fn test_detailed_phases() {
        let r = detailed_payback(dec!(20000), dec!(600), 48, dec!(400), Decimal::ZERO);
        assert_eq!(r.monthly_projection[47].phase, ProjectionPhase::Financing);
        assert_eq!(r.monthly_projection[47].payment, dec!(600));
        assert_eq!(r.monthly_projection[48].phase, ProjectionPhase::PostFinancing);
        assert_eq!(r.monthly_projection[48].payment, Decimal::ZERO);
        // 48 * 600 = 28800 paid; savings reach that at month 72
        assert_eq!(r.break_even_month, Some(72));
        assert_eq!(r.yearly_summary[0].payments, dec!(7200));
        assert_eq!(r.yearly_summary[4].payments, Decimal::ZERO);
    }

    #[test]
    fn test_detailed_cash_purchase() {
        let r = detailed_payback(dec!(24000), Decimal::ZERO, 0, dec!(400), Decimal::ZERO);
        assert_eq!(r.total_paid, dec!(24000));
        assert_eq!(r.monthly_projection[0].payment, dec!(24000));
        assert_eq!(r.break_even_month, Some(60));
        assert_eq!(r.payback.months, Some(60));
        assert_eq!(r.post_financing_monthly_saving, None);
    }

    #[test]
    fn test_detailed_never_breaks_even() {
        let r = detailed_payback(dec!(50000), dec!(2000), 120, dec!(100), Decimal::ZERO);
        assert_eq!(r.break_even_month, None);
        assert!(r.net_savings_after_horizon < Decimal::ZERO);
        assert!(!r.payback.is_reachable());
    }

    #[test]
    fn test_detailed_growing_saving() {
        let r = detailed_payback(dec!(20000), dec!(500), 60, dec!(450), dec!(10));
        assert!(r.monthly_projection[12].saving > r.monthly_projection[0].saving);
        assert!(r.net_savings_after_horizon > dec!(450) * dec!(300) - r.total_paid);
    }

    #[test]
    fn test_calculate_payback_warns_when_unreachable() {
        let out = calculate_payback(&PaybackInput {
            total_cost: dec!(10000),
            monthly_saving: Decimal::ZERO,
            annual_tariff_increase_percent: Decimal::ZERO,
        })
        .unwrap();
        assert!(!out.result.is_reachable());
        assert!(out.warnings[0].contains("not positive"));
    }

    #[test]
    fn test_detailed_serializes_flat_payback_fields() {
        let r = detailed_payback(dec!(20000), dec!(500), 60, dec!(500), Decimal::ZERO);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["months"], serde_json::json!(60));
        assert_eq!(json["display_label"], serde_json::json!("5 years"));
    }
}
