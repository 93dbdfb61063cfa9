use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use bizplan_core::capex::{self, CapexInput};

use super::load_input;

/// Arguments for CAPEX allocation
#[derive(Args)]
pub struct CapexArgs {
    /// Path to JSON/YAML CapexInput file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the debt ratio (equity becomes 1 - debt)
    #[arg(long)]
    pub debt_ratio: Option<Decimal>,
}

pub fn run_capex(args: CapexArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut capex_input: CapexInput = load_input(args.input.as_deref(), "capex")?;
    if let Some(debt) = args.debt_ratio {
        capex_input.debt_ratio = debt;
        capex_input.equity_ratio = Decimal::ONE - debt;
    }

    let result = capex::allocate_capex(&capex_input)?;
    Ok(serde_json::to_value(result)?)
}
