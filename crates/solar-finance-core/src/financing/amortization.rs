use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SolarFinanceError;
use crate::time_value::payment;
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::SolarFinanceResult;

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationInput {
    pub financed_value: Money,
    /// Monthly rate in percent (1.5 = 1.5%)
    pub monthly_rate_percent: Percent,
    pub installments: u32,
}

/// One row of a Price-table schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub installment_number: u32,
    pub opening_balance: Money,
    pub installment: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub installment_value: Money,
    pub total_paid: Money,
    pub total_interest: Money,
    pub rows: Vec<AmortizationRow>,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Level installment of a Price (French) amortization:
/// `PV * r(1+r)^n / ((1+r)^n - 1)`, reducing to `PV / n` at a zero rate.
///
/// Returns zero for a non-positive financed value or zero installments.
pub fn installment_for(
    financed_value: Money,
    monthly_rate_percent: Percent,
    installments: u32,
) -> Money {
    if financed_value <= Decimal::ZERO || installments == 0 {
        return Decimal::ZERO;
    }
    let rate = monthly_rate_percent.max(Decimal::ZERO) / dec!(100);
    payment(rate, installments, financed_value).unwrap_or(Decimal::ZERO)
}

/// Build the month-by-month Price schedule. Installments are quoted to the
/// cent; the last row absorbs the rounding so the loan closes at zero.
pub fn amortization_schedule(
    input: &AmortizationInput,
) -> SolarFinanceResult<ComputationOutput<AmortizationSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.installments == 0 {
        return Err(SolarFinanceError::InvalidInput {
            field: "installments".into(),
            reason: "a schedule needs at least one installment".into(),
        });
    }
    if input.monthly_rate_percent < Decimal::ZERO {
        warnings.push("Negative rate treated as 0%".into());
    }

    let rate = input.monthly_rate_percent.max(Decimal::ZERO) / dec!(100);
    let installment =
        installment_for(input.financed_value, input.monthly_rate_percent, input.installments)
            .round_dp(2);

    let mut rows = Vec::with_capacity(input.installments as usize);
    let mut balance = input.financed_value.max(Decimal::ZERO);
    let mut total_paid = Decimal::ZERO;

    for number in 1..=input.installments {
        let opening = balance;
        let interest = (opening * rate).round_dp(2);
        let (paid, principal) = if number == input.installments {
            (opening + interest, opening)
        } else {
            let principal = (installment - interest).min(opening);
            (principal + interest, principal)
        };
        balance = opening - principal;
        total_paid += paid;

        rows.push(AmortizationRow {
            installment_number: number,
            opening_balance: opening,
            installment: paid,
            interest,
            principal,
            closing_balance: balance,
        });
    }

    if input.financed_value <= Decimal::ZERO {
        warnings.push("Financed value is not positive; every payment is zero".into());
    }

    let output = AmortizationSchedule {
        installment_value: installment,
        total_paid,
        total_interest: total_paid - input.financed_value.max(Decimal::ZERO),
        rows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Price table (level-installment) amortization",
        input,
        warnings,
        elapsed,
        output,
    ))
}
