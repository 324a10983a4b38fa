use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::SolarFinanceError;
use crate::types::{Money, Percent, Rate};
use crate::SolarFinanceResult;

/// Months per year, used for every annual/monthly conversion.
pub const MONTHS_PER_YEAR: u32 = 12;

/// `(1 + r)^n`, or `None` when the power is not representable.
pub fn compound_factor(rate: Rate, nper: u32) -> Option<Decimal> {
    (Decimal::ONE + rate).checked_powi(i64::from(nper))
}

/// Discount factor `(1 + r)^-n`, raised as `(1 / (1 + r))^n` so long or
/// high-rate terms shrink towards zero instead of overflowing.
pub fn discount_factor(rate: Rate, nper: u32) -> Option<Decimal> {
    let base = Decimal::ONE.checked_div(Decimal::ONE + rate)?;
    base.checked_powi(i64::from(nper))
}

/// Annuity factor `(1 - (1+r)^-n) / r`; reduces to `n` at a zero rate.
pub fn annuity_factor(rate: Rate, nper: u32) -> Option<Decimal> {
    if rate.is_zero() {
        return Some(Decimal::from(nper));
    }
    (Decimal::ONE - discount_factor(rate, nper)?).checked_div(rate)
}

/// Present value of `nper` level payments of `pmt` at `rate` per period.
pub fn present_value_of_annuity(rate: Rate, nper: u32, pmt: Money) -> Option<Money> {
    annuity_factor(rate, nper).and_then(|af| pmt.checked_mul(af))
}

/// Level payment that amortizes `present_value` over `nper` periods.
pub fn payment(rate: Rate, nper: u32, present_value: Money) -> SolarFinanceResult<Money> {
    if nper == 0 {
        return Err(SolarFinanceError::InvalidInput {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if rate.is_zero() {
        return Ok(present_value / Decimal::from(nper));
    }

    let not_representable = || SolarFinanceError::InvalidInput {
        field: "rate".into(),
        reason: format!("payment at {rate} over {nper} periods is not representable"),
    };
    let denominator = Decimal::ONE - discount_factor(rate, nper).ok_or_else(not_representable)?;
    if denominator.is_zero() {
        return Ok(present_value / Decimal::from(nper));
    }

    present_value
        .checked_mul(rate)
        .and_then(|x| x.checked_div(denominator))
        .ok_or_else(not_representable)
}

/// Monthly growth rate equivalent to a compounded annual percentage:
/// `(1 + annual/100)^(1/12) - 1`.
///
/// An annual decrease of 100% or more collapses the saving after the
/// first month, so the equivalent rate is -1.
pub fn monthly_equivalent_rate(annual_percent: Percent) -> Rate {
    if annual_percent.is_zero() {
        return Decimal::ZERO;
    }
    let base = Decimal::ONE + annual_percent / dec!(100);
    if base <= Decimal::ZERO {
        return dec!(-1);
    }
    base.checked_powd(Decimal::ONE / Decimal::from(MONTHS_PER_YEAR))
        .map(|g| g - Decimal::ONE)
        .unwrap_or(Decimal::ZERO)
}

/// Sum of `months` savings that start at `monthly_saving` and grow by
/// `monthly_growth` each month.
pub fn compounded_savings(monthly_saving: Money, monthly_growth: Rate, months: u32) -> Money {
    let mut total = Decimal::ZERO;
    let mut current = monthly_saving;
    for _ in 0..months {
        total += current;
        current *= Decimal::ONE + monthly_growth;
    }
    total
}

/// Net Present Value of a series of cash flows, the first at t = 0.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> SolarFinanceResult<Money> {
    if rate <= dec!(-1) {
        return Err(SolarFinanceError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        result += cf / discount;
    }

    Ok(result)
}
