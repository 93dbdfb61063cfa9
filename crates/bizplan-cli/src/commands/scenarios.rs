use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use bizplan_core::scenarios::{self, OutputMetric, SensitivityInput};
use bizplan_core::SensitivityVariable;

use super::dashboard::load_scenario;
use super::load_input;

/// Arguments for a two-way parameter sweep
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a full SensitivityInput file (the flags below are ignored)
    #[arg(long)]
    pub input: Option<String>,

    /// Scenario file to sweep; the built-in base case when omitted
    #[arg(long)]
    pub scenario: Option<String>,

    /// First sensitivity variable in format name:min:max:step
    /// (e.g. "cogs_pct:0.30:0.50:0.05")
    #[arg(long)]
    pub var1: Option<String>,

    /// Second sensitivity variable in format name:min:max:step
    #[arg(long)]
    pub var2: Option<String>,

    /// Metric read from each recomputed plan
    #[arg(long, value_enum, default_value = "npv")]
    pub metric: MetricArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MetricArg {
    Npv,
    Irr,
    Payback,
    Roi,
    FinancialNpv,
    FinancialIrr,
}

impl From<MetricArg> for OutputMetric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Npv => OutputMetric::Npv,
            MetricArg::Irr => OutputMetric::Irr,
            MetricArg::Payback => OutputMetric::PaybackMonths,
            MetricArg::Roi => OutputMetric::Roi,
            MetricArg::FinancialNpv => OutputMetric::FinancialNpv,
            MetricArg::FinancialIrr => OutputMetric::FinancialIrr,
        }
    }
}

fn parse_sens_var(spec: &str) -> Result<SensitivityVariable, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "Sensitivity variable must be name:min:max:step, got '{}'",
            spec
        )
        .into());
    }
    Ok(SensitivityVariable {
        name: parts[0].to_string(),
        min: parts[1].parse::<Decimal>()?,
        max: parts[2].parse::<Decimal>()?,
        step: parts[3].parse::<Decimal>()?,
    })
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sens_input: SensitivityInput = match (args.var1.as_deref(), args.var2.as_deref()) {
        (Some(var1), Some(var2)) if args.input.is_none() => SensitivityInput {
            scenario: load_scenario(args.scenario.as_deref(), &[])?,
            variable_1: parse_sens_var(var1)?,
            variable_2: parse_sens_var(var2)?,
            output_metric: args.metric.into(),
        },
        (Some(_), None) | (None, Some(_)) if args.input.is_none() => {
            return Err("both --var1 and --var2 are required for a sweep".into());
        }
        _ => load_input(args.input.as_deref(), "sensitivity")?,
    };

    let result = scenarios::run_sensitivity(&sens_input)?;
    Ok(serde_json::to_value(result)?)
}
