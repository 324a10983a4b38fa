use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use solar_finance_core::sizing::reverse::{run_reverse_sizing, ReverseCalcInput};
use solar_finance_core::sizing::solar::{size_system, SizingInput, SolarResource};
use solar_finance_core::EngineConfig;

use super::{read_input, required, CommandResult};

/// Where the peak sun hours come from: `--hsp` wins over `--location`.
#[derive(Args)]
pub struct ResourceArgs {
    /// Peak sun hours per day
    #[arg(long)]
    pub hsp: Option<Decimal>,

    /// Location code (Brazilian state, e.g. SP) looked up in the HSP table
    #[arg(long, alias = "state")]
    pub location: Option<String>,
}

impl ResourceArgs {
    fn resource(self) -> Result<SolarResource, Box<dyn std::error::Error>> {
        match (self.hsp, self.location) {
            (Some(hsp), _) => Ok(SolarResource::Hsp(hsp)),
            (None, Some(code)) => Ok(SolarResource::Location(code)),
            (None, None) => Err("--hsp or --location is required (or provide --input)".into()),
        }
    }
}

/// Arguments for sizing by consumption
#[derive(Args)]
pub struct SizeArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Monthly consumption in kWh
    #[arg(long, alias = "consumption")]
    pub monthly_consumption_kwh: Option<Decimal>,

    #[command(flatten)]
    pub resource: ResourceArgs,

    /// Performance factor in (0, 1]; defaults to the configured value
    #[arg(long)]
    pub performance_factor: Option<Decimal>,

    /// Module nameplate power in Wp; adds a module layout
    #[arg(long, alias = "wp")]
    pub module_watt_peak: Option<Decimal>,

    /// Module area in square metres
    #[arg(long)]
    pub module_area_m2: Option<Decimal>,
}

/// Arguments for budget-driven sizing
#[derive(Args)]
pub struct ReverseArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Monthly amount the client can commit
    #[arg(long, alias = "budget")]
    pub monthly_budget: Option<Decimal>,

    /// Utility tariff per kWh
    #[arg(long)]
    pub tariff: Option<Decimal>,

    #[command(flatten)]
    pub resource: ResourceArgs,

    /// Compensation factor in (0, 1]; defaults to the configured value
    #[arg(long)]
    pub compensation_factor: Option<Decimal>,

    /// Print only the financing options
    #[arg(long)]
    pub options_only: bool,
}

pub fn run_size(args: SizeArgs, config: &EngineConfig) -> CommandResult {
    let input: SizingInput = match read_input(args.input.as_deref())? {
        Some(input) => input,
        None => SizingInput {
            monthly_consumption_kwh: required(
                args.monthly_consumption_kwh,
                "monthly-consumption-kwh",
            )?,
            resource: args.resource.resource()?,
            performance_factor: args.performance_factor.unwrap_or(config.performance_factor),
            module_watt_peak: args.module_watt_peak,
            module_area_m2: args.module_area_m2,
        },
    };

    let result = size_system(&input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_reverse(args: ReverseArgs, config: &EngineConfig) -> CommandResult {
    let options_only = args.options_only;
    let input: ReverseCalcInput = match read_input(args.input.as_deref())? {
        Some(input) => input,
        None => ReverseCalcInput {
            monthly_budget: required(args.monthly_budget, "monthly-budget")?,
            tariff: required(args.tariff, "tariff")?,
            resource: args.resource.resource()?,
            compensation_factor: args.compensation_factor,
            config: config.clone(),
        },
    };

    let output = run_reverse_sizing(&input)?;
    let options = serde_json::to_value(&output.result.financing_options)?;
    let mut value = serde_json::to_value(output)?;

    if let Value::Object(map) = &mut value {
        if options_only {
            if let Some(Value::Object(result)) = map.get_mut("result") {
                result.retain(|key, _| key == "financing_options");
            }
        }
        // One row per candidate term for table and CSV output
        map.insert("results".into(), options);
    }
    Ok(value)
}
