use std::collections::BTreeMap;
use std::path::Path;

use clap::{Args, Subcommand};
use serde_json::{json, Value};

use aligner_costing_core::rates::{RateResolver, RateSet, RateSetUpdate, YearlyRateTable};

use crate::input;

#[derive(Args)]
pub struct RatesArgs {
    #[command(subcommand)]
    pub command: RatesCommand,
}

#[derive(Subcommand)]
pub enum RatesCommand {
    /// Print fully-resolved rate sets (defaults filled in)
    Show(ShowArgs),
    /// Insert-or-update one year's rates from a patch
    Update(UpdateArgs),
}

#[derive(Args)]
pub struct ShowArgs {
    /// Path to the yearly rates file (defaults apply when omitted)
    #[arg(long)]
    pub rates: Option<String>,

    /// Resolve a single year instead of every stored year
    #[arg(long)]
    pub year: Option<i32>,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Path to the yearly rates file; created when missing
    #[arg(long)]
    pub rates: String,

    /// Year to insert or update
    #[arg(long)]
    pub year: i32,

    /// Path to the patch file ({variable?, direct?, fixed?}); stdin when
    /// omitted
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_rates(args: RatesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    match args.command {
        RatesCommand::Show(args) => run_show(args),
        RatesCommand::Update(args) => run_update(args),
    }
}

fn run_show(args: ShowArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let table = super::load_rates(args.rates.as_deref())?;

    if let Some(year) = args.year {
        return Ok(serde_json::to_value(table.resolve(year))?);
    }

    let resolved: BTreeMap<i32, RateSet> = table
        .years()
        .into_iter()
        .map(|year| (year, table.resolve(year)))
        .collect();
    if resolved.is_empty() {
        return Err("no stored years; pass --year to resolve defaults".into());
    }
    Ok(serde_json::to_value(resolved)?)
}

fn run_update(args: UpdateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut table = if Path::new(&args.rates).exists() {
        input::file::read_document(&args.rates)?
    } else {
        YearlyRateTable::new()
    };

    let update: RateSetUpdate = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(value) = input::stdin::read_stdin()? {
        serde_json::from_value(value)?
    } else {
        return Err("--input is required (or pipe a JSON patch via stdin)".into());
    };

    table.upsert(args.year, update);
    input::file::write_document(&args.rates, &table)?;

    Ok(json!({
        "success": true,
        "year": args.year,
        "resolved": serde_json::to_value(table.resolve(args.year))?,
    }))
}
