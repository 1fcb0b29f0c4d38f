use clap::Args;
use serde_json::Value;

use aligner_costing_core::aggregation::compute_all;
use aligner_costing_core::pricing::PricingPolicy;

use super::{load_rates, load_treatments};

/// Arguments for the per-treatment cost decomposition
#[derive(Args)]
pub struct ComputeArgs {
    /// Path to the treatments file (JSON or YAML array)
    #[arg(long)]
    pub treatments: Option<String>,

    /// Path to the yearly rates file (defaults apply when omitted)
    #[arg(long)]
    pub rates: Option<String>,
}

pub fn run_compute(args: ComputeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let treatments = load_treatments(&args.treatments)?;
    let table = load_rates(args.rates.as_deref())?;

    let output = compute_all(&treatments, &table, &PricingPolicy::default());
    Ok(serde_json::to_value(&output)?)
}
