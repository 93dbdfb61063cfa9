use clap::{Args, ValueEnum};
use serde_json::Value;

use bizplan_core::cash_flow::{self, CashFlowInput};

use super::load_input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SeriesView {
    /// Both series plus depreciation
    Both,
    Economic,
    Financial,
}

/// Arguments for cash-flow derivation
#[derive(Args)]
pub struct CashFlowArgs {
    /// Path to JSON/YAML CashFlowInput file
    #[arg(long)]
    pub input: Option<String>,

    /// Which series to print
    #[arg(long, value_enum, default_value = "both")]
    pub series: SeriesView,
}

pub fn run_cash_flow(args: CashFlowArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cf_input: CashFlowInput = load_input(args.input.as_deref(), "cash-flow")?;
    let result = cash_flow::derive_cash_flows(&cf_input)?;

    let mut value = serde_json::to_value(&result)?;
    let picked = match args.series {
        SeriesView::Both => None,
        SeriesView::Economic => Some(serde_json::to_value(&result.result.economic)?),
        SeriesView::Financial => Some(serde_json::to_value(&result.result.financial)?),
    };
    if let (Some(series), Some(obj)) = (picked, value.as_object_mut()) {
        obj.insert("result".into(), series);
    }
    Ok(value)
}
