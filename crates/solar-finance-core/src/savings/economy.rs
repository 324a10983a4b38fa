use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::time_value::MONTHS_PER_YEAR;
use crate::types::{with_metadata, ComputationOutput, Kwh, Money};
use crate::SolarFinanceResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyInput {
    /// Monthly photovoltaic generation
    pub generation_kwh: Kwh,
    /// Utility tariff per kWh
    pub tariff: Money,
    /// Fraction of generated energy that offsets the bill, in (0, 1]
    pub compensation_factor: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyOutput {
    pub monthly_saving: Money,
    pub annual_saving: Money,
    /// Energy that actually offsets billed consumption
    pub compensated_kwh: Kwh,
}

/// Monthly bill reduction: `generation * compensation_factor * tariff`.
///
/// The compensation factor is opaque here; non-positive generation, tariff
/// or factor yield zero.
pub fn monthly_saving(generation_kwh: Kwh, tariff: Money, compensation_factor: Decimal) -> Money {
    if generation_kwh <= Decimal::ZERO
        || tariff <= Decimal::ZERO
        || compensation_factor <= Decimal::ZERO
    {
        return Decimal::ZERO;
    }
    generation_kwh * compensation_factor * tariff
}

pub fn calculate_economy(input: &EconomyInput) -> SolarFinanceResult<ComputationOutput<EconomyOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.tariff <= Decimal::ZERO {
        warnings.push("Tariff is not positive; saving reported as 0".into());
    }
    if input.compensation_factor > Decimal::ONE {
        warnings.push(format!(
            "Compensation factor {} exceeds 1; more energy is credited than generated",
            input.compensation_factor
        ));
    }

    let saving = monthly_saving(input.generation_kwh, input.tariff, input.compensation_factor);
    let compensated_kwh = if saving.is_zero() {
        Decimal::ZERO
    } else {
        input.generation_kwh * input.compensation_factor
    };

    let output = EconomyOutput {
        monthly_saving: saving,
        annual_saving: saving * Decimal::from(MONTHS_PER_YEAR),
        compensated_kwh,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Compensated generation valued at the utility tariff",
        input,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_monthly_saving_known_answer() {
        assert_eq!(monthly_saving(dec!(1000), dec!(0.85), dec!(0.85)), dec!(722.50));
    }

    #[test]
    fn test_non_positive_generation_saves_nothing() {
        assert_eq!(monthly_saving(Decimal::ZERO, dec!(0.85), dec!(0.85)), Decimal::ZERO);
        assert_eq!(monthly_saving(dec!(-10), dec!(0.85), dec!(0.85)), Decimal::ZERO);
    }

    #[test]
    fn test_full_compensation() {
        assert_eq!(monthly_saving(dec!(500), dec!(0.9), Decimal::ONE), dec!(450));
    }

    #[test]
    fn test_calculate_economy() {
        let out = calculate_economy(&EconomyInput {
            generation_kwh: dec!(1000),
            tariff: dec!(0.85),
            compensation_factor: dec!(0.85),
        })
        .unwrap();
        assert_eq!(out.result.monthly_saving, dec!(722.5));
        assert_eq!(out.result.annual_saving, dec!(8670));
        assert_eq!(out.result.compensated_kwh, dec!(850));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_calculate_economy_warns_on_zero_tariff() {
        let out = calculate_economy(&EconomyInput {
            generation_kwh: dec!(1000),
            tariff: Decimal::ZERO,
            compensation_factor: dec!(0.85),
        })
        .unwrap();
        assert_eq!(out.result.monthly_saving, Decimal::ZERO);
        assert_eq!(out.warnings.len(), 1);
    }
}
