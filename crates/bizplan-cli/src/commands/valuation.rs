use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use bizplan_core::valuation::{self, ValuationInput};
use bizplan_core::FlowSeries;

use super::load_optional_input;

/// Arguments for NPV / IRR / payback valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ValuateArgs {
    /// Path to JSON/YAML ValuationInput file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Outlay before operations start, as a positive amount
    #[arg(long)]
    pub initial_investment: Option<Decimal>,

    /// Operating-year cash flows, comma separated (e.g. -100000,200000,300000)
    #[arg(long, value_delimiter = ',')]
    pub flows: Vec<Decimal>,

    /// Discount rate (e.g. 0.10 for 10%); overrides the file's rate
    #[arg(long)]
    pub discount_rate: Option<Decimal>,
}

pub fn run_valuate(args: ValuateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut val_input: ValuationInput = match load_optional_input(args.input.as_deref())? {
        Some(v) => v,
        None => {
            if args.flows.is_empty() {
                return Err("--flows is required (or provide --input)".into());
            }
            ValuationInput {
                series: FlowSeries::new(
                    args.initial_investment
                        .ok_or("--initial-investment is required (or provide --input)")?,
                    args.flows.clone(),
                ),
                discount_rate: args
                    .discount_rate
                    .ok_or("--discount-rate is required (or provide --input)")?,
            }
        }
    };
    if let Some(rate) = args.discount_rate {
        val_input.discount_rate = rate;
    }

    let result = valuation::value_cash_flows(&val_input)?;
    Ok(serde_json::to_value(result)?)
}
