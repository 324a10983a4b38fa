mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use solar_finance_core::EngineConfig;

use commands::financing::{DetectRateArgs, InstallmentArgs, ScheduleArgs};
use commands::savings::{DetailedPaybackArgs, EconomyArgs, PaybackArgs};
use commands::sizing::{ReverseArgs, SizeArgs};

/// Solar investment financing and sizing calculations
#[derive(Parser)]
#[command(
    name = "solar",
    version,
    about = "Solar investment financing and sizing calculations",
    long_about = "A CLI for evaluating photovoltaic investments with decimal precision. \
                  Detects the interest rate hidden in a loan quote, builds amortization \
                  schedules, projects savings and payback, and sizes systems from \
                  consumption or from a monthly budget."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (JSON or YAML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the monthly interest rate implied by a loan quote
    DetectRate(DetectRateArgs),
    /// Level installment for a financed value, rate and term
    Installment(InstallmentArgs),
    /// Month-by-month Price amortization schedule
    Schedule(ScheduleArgs),
    /// Monthly saving from generation, tariff and compensation factor
    Economy(EconomyArgs),
    /// Months until savings recover a cost
    Payback(PaybackArgs),
    /// 25-year projection of a financed or cash purchase
    DetailedPayback(DetailedPaybackArgs),
    /// Size a system for a monthly consumption
    Size(SizeArgs),
    /// Size a system from a monthly budget and compare payment options
    Reverse(ReverseArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let config = input::file::read_config(path)?;
            tracing::info!(path, "loaded engine configuration");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(2);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::DetectRate(args) => commands::financing::run_detect_rate(args),
        Commands::Installment(args) => commands::financing::run_installment(args),
        Commands::Schedule(args) => commands::financing::run_schedule(args),
        Commands::Economy(args) => commands::savings::run_economy(args, &config),
        Commands::Payback(args) => commands::savings::run_payback(args, &config),
        Commands::DetailedPayback(args) => commands::savings::run_detailed_payback(args, &config),
        Commands::Size(args) => commands::sizing::run_size(args, &config),
        Commands::Reverse(args) => commands::sizing::run_reverse(args, &config),
        Commands::Version => {
            println!("solar {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
