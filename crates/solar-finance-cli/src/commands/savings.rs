use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use solar_finance_core::savings::economy::{calculate_economy, EconomyInput};
use solar_finance_core::savings::payback::{
    calculate_detailed_payback, calculate_payback, DetailedPaybackInput, PaybackInput,
};
use solar_finance_core::EngineConfig;

use super::{read_input, required, CommandResult};

/// Arguments for the monthly saving
#[derive(Args)]
pub struct EconomyArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Monthly generation in kWh
    #[arg(long, alias = "generation")]
    pub generation_kwh: Option<Decimal>,

    /// Utility tariff per kWh
    #[arg(long)]
    pub tariff: Option<Decimal>,

    /// Compensation factor in (0, 1]; defaults to the configured value
    #[arg(long)]
    pub compensation_factor: Option<Decimal>,
}

/// Arguments for simple payback
#[derive(Args)]
pub struct PaybackArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Cost to recover
    #[arg(long, alias = "cost")]
    pub total_cost: Option<Decimal>,

    /// Saving in the first month
    #[arg(long, alias = "saving")]
    pub monthly_saving: Option<Decimal>,

    /// Yearly tariff increase in percent; defaults to the configured value
    #[arg(long, alias = "increase")]
    pub annual_tariff_increase_percent: Option<Decimal>,
}

/// Arguments for the 25-year projection
#[derive(Args)]
pub struct DetailedPaybackArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Price of the system
    #[arg(long)]
    pub system_value: Option<Decimal>,

    /// Installment value; omit with --installments 0 for a cash purchase
    #[arg(long, default_value = "0")]
    pub installment_value: Decimal,

    /// Number of installments (0 for a cash purchase)
    #[arg(long, short = 'n', default_value_t = 0)]
    pub installments: u32,

    /// Saving in the first month
    #[arg(long, alias = "saving")]
    pub monthly_saving: Option<Decimal>,

    /// Yearly tariff increase in percent; defaults to the configured value
    #[arg(long, alias = "increase")]
    pub annual_tariff_increase_percent: Option<Decimal>,

    /// Leave the month-by-month rows out of the output
    #[arg(long)]
    pub summary_only: bool,
}

pub fn run_economy(args: EconomyArgs, config: &EngineConfig) -> CommandResult {
    let input: EconomyInput = match read_input(args.input.as_deref())? {
        Some(input) => input,
        None => EconomyInput {
            generation_kwh: required(args.generation_kwh, "generation-kwh")?,
            tariff: required(args.tariff, "tariff")?,
            compensation_factor: args
                .compensation_factor
                .unwrap_or(config.default_compensation_factor),
        },
    };

    let result = calculate_economy(&input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_payback(args: PaybackArgs, config: &EngineConfig) -> CommandResult {
    let input: PaybackInput = match read_input(args.input.as_deref())? {
        Some(input) => input,
        None => PaybackInput {
            total_cost: required(args.total_cost, "total-cost")?,
            monthly_saving: required(args.monthly_saving, "monthly-saving")?,
            annual_tariff_increase_percent: args
                .annual_tariff_increase_percent
                .unwrap_or(config.annual_tariff_increase_percent),
        },
    };

    let result = calculate_payback(&input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_detailed_payback(args: DetailedPaybackArgs, config: &EngineConfig) -> CommandResult {
    let summary_only = args.summary_only;
    let input: DetailedPaybackInput = match read_input(args.input.as_deref())? {
        Some(input) => input,
        None => DetailedPaybackInput {
            system_value: required(args.system_value, "system-value")?,
            installment_value: args.installment_value,
            installments: args.installments,
            monthly_saving: required(args.monthly_saving, "monthly-saving")?,
            annual_tariff_increase_percent: args
                .annual_tariff_increase_percent
                .unwrap_or(config.annual_tariff_increase_percent),
        },
    };

    let output = calculate_detailed_payback(&input)?;
    let yearly = serde_json::to_value(&output.result.yearly_summary)?;
    let mut value = serde_json::to_value(output)?;

    if let Value::Object(map) = &mut value {
        if let Some(Value::Object(result)) = map.get_mut("result") {
            result.remove("yearly_summary");
            if summary_only {
                result.remove("monthly_projection");
            }
        }
        // One row per year for table and CSV output
        map.insert("results".into(), yearly);
    }
    Ok(value)
}
