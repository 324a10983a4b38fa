use solar_finance_core::savings::economy::monthly_saving;
use solar_finance_core::savings::payback::{
    calculate_detailed_payback, detailed_payback, payback_label, simple_payback,
    DetailedPaybackInput, ProjectionPhase,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Economy
// ===========================================================================

#[test]
fn test_monthly_saving_reference_case() {
    assert_eq!(monthly_saving(dec!(1000), dec!(0.85), dec!(0.85)), dec!(722.50));
}

// ===========================================================================
// Simple payback
// ===========================================================================

#[test]
fn test_payback_in_whole_years() {
    let p = simple_payback(dec!(30000), dec!(500), Decimal::ZERO);
    assert_eq!(p.months, Some(60));
    assert_eq!(p.years, Some(dec!(5)));
    assert_eq!(p.display_label, "5 years");
}

#[test]
fn test_payback_with_remainder_months() {
    let p = simple_payback(dec!(31000), dec!(500), Decimal::ZERO);
    assert_eq!(p.months, Some(62));
    assert_eq!(p.display_label, "5 years and 2 months");
}

#[test]
fn test_payback_label_forms() {
    assert_eq!(payback_label(7), "7 months");
    assert_eq!(payback_label(12), "1 year");
    assert_eq!(payback_label(13), "1 year and 1 month");
    assert_eq!(payback_label(26), "2 years and 2 months");
}

#[test]
fn test_tariff_increase_shortens_payback() {
    let flat = simple_payback(dec!(30000), dec!(500), Decimal::ZERO);
    let growing = simple_payback(dec!(30000), dec!(500), dec!(6));
    assert!(growing.months.unwrap() < flat.months.unwrap());
}

#[test]
fn test_payback_beyond_600_months_is_unreachable() {
    let p = simple_payback(dec!(1_000_000), dec!(100), Decimal::ZERO);
    assert!(!p.is_reachable());
    assert_eq!(p.years, None);
}

// ===========================================================================
// Detailed payback
// ===========================================================================

#[test]
fn test_detailed_payback_financed() {
    let r = detailed_payback(dec!(24464), dec!(651.96), 60, dec!(679.915), dec!(6));

    assert_eq!(r.monthly_projection.len(), 300);
    assert_eq!(r.yearly_summary.len(), 25);
    assert_eq!(r.total_paid, dec!(39117.60));

    // Saving already exceeds the installment in month 1
    assert_eq!(r.break_even_month, Some(1));

    assert_eq!(r.monthly_projection[59].phase, ProjectionPhase::Financing);
    assert_eq!(r.monthly_projection[60].phase, ProjectionPhase::PostFinancing);
    assert_eq!(r.monthly_projection[60].payment, Decimal::ZERO);
    assert_eq!(
        r.post_financing_monthly_saving,
        Some(r.monthly_projection[60].saving)
    );

    // The headline payback is against everything paid, interest included
    let against_total = simple_payback(dec!(39117.60), dec!(679.915), dec!(6));
    assert_eq!(r.payback, against_total);

    let last = r.monthly_projection.last().unwrap();
    assert_eq!(r.net_savings_after_horizon, last.accumulated_savings - r.total_paid);
}

#[test]
fn test_detailed_payback_yearly_rollup() {
    let r = detailed_payback(dec!(24464), dec!(651.96), 60, dec!(679.915), dec!(6));
    let first_year: Decimal = r.monthly_projection[..12].iter().map(|m| m.saving).sum();
    assert_eq!(r.yearly_summary[0].savings, first_year);
    assert_eq!(r.yearly_summary[0].payments, dec!(651.96) * dec!(12));
    assert_eq!(r.yearly_summary[5].payments, Decimal::ZERO);
}

#[test]
fn test_detailed_payback_cash_purchase() {
    let out = calculate_detailed_payback(&DetailedPaybackInput {
        system_value: dec!(23240.80),
        installment_value: Decimal::ZERO,
        installments: 0,
        monthly_saving: dec!(679.915),
        annual_tariff_increase_percent: dec!(6),
    })
    .unwrap();
    let r = &out.result;

    assert_eq!(r.total_paid, dec!(23240.80));
    assert_eq!(r.monthly_projection[0].payment, dec!(23240.80));
    assert_eq!(r.post_financing_monthly_saving, None);
    // Month of break-even matches the payback month when the price is paid upfront
    assert_eq!(r.break_even_month, r.payback.months);
    assert!(out.warnings.iter().any(|w| w.contains("cash purchase")));
}

#[test]
fn test_detailed_payback_without_saving_never_breaks_even() {
    let r = detailed_payback(dec!(20000), dec!(500), 60, Decimal::ZERO, dec!(6));
    assert_eq!(r.break_even_month, None);
    assert!(!r.payback.is_reachable());
    assert_eq!(r.net_savings_after_horizon, dec!(-30000));
}
