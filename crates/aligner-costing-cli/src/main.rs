mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::compute::ComputeArgs;
use commands::rates::RatesArgs;
use commands::stats::StatsArgs;
use commands::summary::SummaryArgs;

/// Cost accounting for aligner manufacturing
#[derive(Parser)]
#[command(
    name = "alq",
    version,
    about = "Cost accounting for aligner manufacturing",
    long_about = "Per-treatment cost/profit decomposition and dashboard aggregates \
                  for an aligner manufacturing business, with decimal precision. \
                  Applies yearly rate tables, hours-based fixed-cost burden, \
                  cost-plus pricing overrides, and break-even analysis."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the cost/profit decomposition for every treatment
    Compute(ComputeArgs),
    /// Financial summary with break-even analysis
    Summary(SummaryArgs),
    /// Dashboard statistics (counts, revenue, averages)
    Stats(StatsArgs),
    /// Inspect or update the yearly rate tables
    Rates(RatesArgs),
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

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Compute(args) => commands::compute::run_compute(args),
        Commands::Summary(args) => commands::summary::run_summary(args),
        Commands::Stats(args) => commands::stats::run_stats(args),
        Commands::Rates(args) => commands::rates::run_rates(args),
        Commands::Version => {
            println!("alq {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
