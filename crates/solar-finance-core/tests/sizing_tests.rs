use solar_finance_core::config::{CandidateTerm, EngineConfig};
use solar_finance_core::sizing::reverse::{
    reverse_calculate, run_reverse_sizing, ReverseCalcInput, SizingConstraint, Viability,
};
use solar_finance_core::sizing::solar::{
    expected_generation, hsp_for_location, required_power, size_system, SizingInput,
    SolarResource, FALLBACK_HSP,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn default_case() -> solar_finance_core::sizing::reverse::ReverseCalcResult {
    reverse_calculate(
        dec!(800),
        dec!(0.95),
        &SolarResource::Hsp(dec!(5.0)),
        dec!(0.85),
        &EngineConfig::default(),
    )
    .unwrap()
}

// ===========================================================================
// Forward sizing
// ===========================================================================

#[test]
fn test_required_power_and_generation() {
    // 5.0 h x 0.80 x 30 days = 120 kWh per kWp
    assert_eq!(required_power(dec!(600), dec!(5.0), dec!(0.80)), dec!(5));
    assert_eq!(expected_generation(dec!(5), dec!(5.0), dec!(0.80)), dec!(600));
    assert_eq!(required_power(dec!(500), dec!(5.0), dec!(0.80)), dec!(4.17));
}

#[test]
fn test_non_positive_inputs_size_to_zero() {
    assert_eq!(required_power(Decimal::ZERO, dec!(5.0), dec!(0.80)), Decimal::ZERO);
    assert_eq!(required_power(dec!(500), Decimal::ZERO, dec!(0.80)), Decimal::ZERO);
    assert_eq!(expected_generation(dec!(-1), dec!(5.0), dec!(0.80)), Decimal::ZERO);
}

#[test]
fn test_unknown_location_uses_fallback() {
    assert_eq!(hsp_for_location("ZZ"), FALLBACK_HSP);
    assert_eq!(hsp_for_location("rj"), hsp_for_location("RJ"));
}

#[test]
fn test_size_system_with_layout() {
    let out = size_system(&SizingInput {
        monthly_consumption_kwh: dec!(600),
        resource: SolarResource::Hsp(dec!(5.0)),
        performance_factor: dec!(0.80),
        module_watt_peak: Some(dec!(550)),
        module_area_m2: None,
    })
    .unwrap();
    let layout = out.result.layout.unwrap();
    // 5 kWp / 0.55 kWp -> 10 modules
    assert_eq!(layout.module_count, 10);
    assert_eq!(layout.installed_power_kwp, dec!(5.5));
    assert_eq!(out.result.sizing.recommended_power_kwp, dec!(5));
}

// ===========================================================================
// Reverse sizing
// ===========================================================================

#[test]
fn test_reverse_recommendation_matches_consumption() {
    let r = default_case();
    let rec = &r.recommendation;
    assert_eq!(rec.limited_by, SizingConstraint::Consumption);
    assert_eq!(rec.sizing.recommended_power_kwp, dec!(7.02));
    assert_eq!(rec.sizing.expected_generation_kwh, dec!(842));
    assert_eq!(rec.monthly_cashflow, dec!(679.915) - dec!(651.96));
    assert!(rec.coverage_percent <= dec!(100));
}

#[test]
fn test_reverse_scenarios() {
    let r = default_case();

    let zero = r.scenarios.cashflow_zero.expect("break-even system exists");
    assert!((zero.sizing.recommended_power_kwp - dec!(1.91)).abs() <= dec!(0.01));
    assert!(zero.monthly_cashflow.abs() < dec!(2), "got {}", zero.monthly_cashflow);
    assert_eq!(zero.installments, 120);

    let positive = r.scenarios.cashflow_positive.expect("surplus system exists");
    assert!((positive.sizing.recommended_power_kwp - dec!(6.09)).abs() <= dec!(0.01));
    assert!((positive.monthly_cashflow - dec!(100)).abs() < dec!(2));
    assert!(positive.sizing.recommended_power_kwp > zero.sizing.recommended_power_kwp);
}

#[test]
fn test_thirty_year_term_at_extreme_rate() {
    let mut config = EngineConfig::default();
    config
        .financing
        .candidate_terms
        .push(CandidateTerm::new(360, dec!(20)));
    assert!(config.validate().is_ok());

    let r = reverse_calculate(
        dec!(800),
        dec!(0.95),
        &SolarResource::Hsp(dec!(5.0)),
        dec!(0.85),
        &config,
    )
    .unwrap();
    assert_eq!(r.financing_options.len(), 8);

    let value = r.recommendation.system_value;
    let long = r.financing_options.last().unwrap();
    assert_eq!(long.installments, 360);
    assert!(long.installment_value > Decimal::ZERO);
    assert!(
        (long.installment_value - value * dec!(0.2)).abs() < dec!(0.01),
        "{} for {}",
        long.installment_value,
        value
    );
    assert_eq!(long.viability, Viability::Negative);
}

#[test]
fn test_longer_terms_lower_the_installment() {
    let r = default_case();
    for pair in r.financing_options.windows(2) {
        assert!(pair[1].installment_value < pair[0].installment_value);
        assert!(pair[1].monthly_cashflow > pair[0].monthly_cashflow);
        assert!(pair[1].total_paid > pair[0].total_paid);
    }
}

#[test]
fn test_option_viability_by_term() {
    let r = default_case();
    let by_term = |n: u32| {
        r.financing_options
            .iter()
            .find(|o| o.installments == n)
            .unwrap()
            .viability
    };
    assert_eq!(by_term(36), Viability::Negative);
    assert_eq!(by_term(48), Viability::Tight);
    assert_eq!(by_term(60), Viability::Good);
    assert_eq!(by_term(96), Viability::Excellent);
}

#[test]
fn test_option_npv_is_positive_over_25_years() {
    let r = default_case();
    assert!(r.financing_options.iter().all(|o| o.net_present_value > Decimal::ZERO));
    // Shorter terms pay less interest, so they are worth more
    let first = &r.financing_options[0];
    let last = r.financing_options.last().unwrap();
    assert!(first.net_present_value > last.net_present_value);
}

#[test]
fn test_cash_beats_financing_on_payback() {
    let r = default_case();
    let cash_years = r.cash_option.payback_years.unwrap();
    for option in &r.financing_options {
        assert!(option.payback_years.unwrap() >= cash_years);
    }
}

#[test]
fn test_budget_limited_client() {
    let r = reverse_calculate(
        dec!(800),
        dec!(0.5),
        &SolarResource::Hsp(dec!(5.0)),
        dec!(0.85),
        &EngineConfig::default(),
    )
    .unwrap();
    assert_eq!(r.recommendation.limited_by, SizingConstraint::Budget);
    assert!(r.recommendation.installment_value <= dec!(800));
    assert!(r.scenarios.cashflow_zero.is_none());
    assert!(r.scenarios.cashflow_positive.is_none());
    assert!(r
        .financing_options
        .iter()
        .all(|o| o.viability == Viability::Negative));
}

#[test]
fn test_custom_pricing_changes_the_recommendation() {
    let mut config = EngineConfig::default();
    config.pricing.price_per_kwp = dec!(6000);
    let r = reverse_calculate(
        dec!(800),
        dec!(0.95),
        &SolarResource::Hsp(dec!(5.0)),
        dec!(0.85),
        &config,
    )
    .unwrap();
    // Pricier systems stop fitting the budget before covering consumption
    assert_eq!(r.recommendation.limited_by, SizingConstraint::Budget);
    assert!(r.recommendation.sizing.recommended_power_kwp < dec!(7.02));
}

#[test]
fn test_reverse_envelope_warns_for_unknown_location() {
    let input = ReverseCalcInput {
        monthly_budget: dec!(800),
        tariff: dec!(0.95),
        resource: SolarResource::Location("XX".into()),
        compensation_factor: None,
        config: EngineConfig::default(),
    };
    let out = run_reverse_sizing(&input).unwrap();
    assert_eq!(out.result.recommendation.sizing.hsp_used, FALLBACK_HSP);
    assert!(out.warnings.iter().any(|w| w.contains("fallback HSP")));
}

#[test]
fn test_reverse_envelope_zero_budget() {
    let input = ReverseCalcInput {
        monthly_budget: Decimal::ZERO,
        tariff: dec!(0.95),
        resource: SolarResource::Hsp(dec!(5.0)),
        compensation_factor: Some(dec!(0.85)),
        config: EngineConfig::default(),
    };
    let out = run_reverse_sizing(&input).unwrap();
    assert!(out.result.financing_options.is_empty());
    assert_eq!(out.warnings.len(), 1);
}
