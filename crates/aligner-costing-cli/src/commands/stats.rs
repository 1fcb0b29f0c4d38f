use chrono::{Local, NaiveDate};
use clap::Args;
use serde_json::Value;

use aligner_costing_core::aggregation::{compute_all, dashboard_stats, YearSelection};
use aligner_costing_core::pricing::PricingPolicy;

use super::{load_rates, load_treatments};

/// Arguments for dashboard statistics
#[derive(Args)]
pub struct StatsArgs {
    /// Path to the treatments file (JSON or YAML array)
    #[arg(long)]
    pub treatments: Option<String>,

    /// Path to the yearly rates file (defaults apply when omitted)
    #[arg(long)]
    pub rates: Option<String>,

    /// Year filter: "all" or a single year
    #[arg(long, default_value = "all")]
    pub year: YearSelection,

    /// Proration reference date (today when omitted)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

pub fn run_stats(args: StatsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let treatments = load_treatments(&args.treatments)?;
    let table = load_rates(args.rates.as_deref())?;
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());

    let computed = compute_all(&treatments, &table, &PricingPolicy::default()).result;
    let filtered: Vec<_> = computed
        .into_iter()
        .filter(|c| args.year.matches(c.treatment_year))
        .collect();

    let output = dashboard_stats(&filtered, &table, args.year, as_of);
    Ok(serde_json::to_value(&output)?)
}
