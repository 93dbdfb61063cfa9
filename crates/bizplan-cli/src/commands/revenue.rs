use clap::Args;
use serde_json::Value;

use bizplan_core::revenue::{self, RevenueInput};

use super::load_input;

/// Arguments for revenue projection
#[derive(Args)]
pub struct RevenueArgs {
    /// Path to JSON/YAML RevenueInput file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_revenue(args: RevenueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let revenue_input: RevenueInput = load_input(args.input.as_deref(), "revenue")?;
    let result = revenue::project_revenue(&revenue_input)?;
    Ok(serde_json::to_value(result)?)
}
