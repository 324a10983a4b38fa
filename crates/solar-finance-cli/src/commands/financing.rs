use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use solar_finance_core::financing::amortization::{amortization_schedule, AmortizationInput};
use solar_finance_core::financing::rate_solver::{analyze_loan, LoanTerms};

use super::{read_input, required, CommandResult};

/// Arguments for rate detection
#[derive(Args)]
pub struct DetectRateArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount financed
    #[arg(long, alias = "pv")]
    pub financed_value: Option<Decimal>,

    /// Number of monthly installments
    #[arg(long, short = 'n')]
    pub installments: Option<u32>,

    /// Quoted installment value
    #[arg(long, alias = "pmt")]
    pub installment_value: Option<Decimal>,
}

/// Arguments shared by the installment and schedule commands
#[derive(Args)]
pub struct InstallmentArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount financed
    #[arg(long, alias = "pv")]
    pub financed_value: Option<Decimal>,

    /// Monthly rate in percent (1.5 = 1.5%)
    #[arg(long, alias = "rate")]
    pub monthly_rate_percent: Option<Decimal>,

    /// Number of monthly installments
    #[arg(long, short = 'n')]
    pub installments: Option<u32>,
}

pub type ScheduleArgs = InstallmentArgs;

pub fn run_detect_rate(args: DetectRateArgs) -> CommandResult {
    let terms: LoanTerms = match read_input(args.input.as_deref())? {
        Some(terms) => terms,
        None => LoanTerms {
            financed_value: required(args.financed_value, "financed-value")?,
            installments: required(args.installments, "installments")?,
            installment_value: required(args.installment_value, "installment-value")?,
        },
    };

    let result = analyze_loan(&terms)?;
    Ok(serde_json::to_value(result)?)
}

fn amortization_input(args: InstallmentArgs) -> Result<AmortizationInput, Box<dyn std::error::Error>> {
    Ok(match read_input(args.input.as_deref())? {
        Some(input) => input,
        None => AmortizationInput {
            financed_value: required(args.financed_value, "financed-value")?,
            monthly_rate_percent: required(args.monthly_rate_percent, "monthly-rate-percent")?,
            installments: required(args.installments, "installments")?,
        },
    })
}

/// Schedule headline without the per-month rows.
pub fn run_installment(args: InstallmentArgs) -> CommandResult {
    let input = amortization_input(args)?;
    let mut value = serde_json::to_value(amortization_schedule(&input)?)?;
    if let Some(Value::Object(result)) = value.get_mut("result") {
        result.remove("rows");
    }
    Ok(value)
}

/// Rows are promoted to a top-level `results` array so table and CSV output
/// render one line per installment.
pub fn run_schedule(args: ScheduleArgs) -> CommandResult {
    let input = amortization_input(args)?;
    let output = amortization_schedule(&input)?;
    let rows = serde_json::to_value(&output.result.rows)?;
    let mut value = serde_json::to_value(output)?;
    if let Value::Object(map) = &mut value {
        map.insert("results".into(), rows);
    }
    Ok(value)
}
