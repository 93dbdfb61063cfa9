use clap::Args;
use colored::Colorize;
use rust_decimal::Decimal;
use serde_json::Value;

use bizplan_core::config::{ParameterSet, ScenarioConfig};
use bizplan_core::dashboard::{
    compute_plan, default_scenario, AdvisoryNotifier, Collaborators, Dashboard, ModelState,
    ModelStateSource,
};

use super::load_optional_input;
use crate::input;

/// Arguments for the dashboard snapshot
#[derive(Args)]
pub struct DashboardArgs {
    /// Path to JSON/YAML scenario file; the built-in base case when omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Path to cached model values to reconcile against
    #[arg(long)]
    pub model_state: Option<String>,

    /// Parameter override as key=value (repeatable, e.g. --set cogs_pct=0.3)
    #[arg(long = "set", value_parser = parse_override)]
    pub overrides: Vec<(String, Decimal)>,

    /// Print every stage output instead of the snapshot
    #[arg(long)]
    pub full: bool,
}

struct StderrAdvisory;

impl AdvisoryNotifier for StderrAdvisory {
    fn notify(&self, message: &str) {
        eprintln!("{}: {}", "advisory".yellow().bold(), message);
    }
}

struct CachedModelState(ModelState);

impl ModelStateSource for CachedModelState {
    fn model_state(&self) -> Option<ModelState> {
        Some(self.0.clone())
    }
}

pub fn parse_override(s: &str) -> Result<(String, Decimal), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("override must be key=value, got '{s}'"))?;
    let key = key.trim();
    if !ParameterSet::is_known_key(key) {
        return Err(format!("unknown parameter '{key}'"));
    }
    let value: Decimal = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value for '{key}': {e}"))?;
    Ok((key.to_string(), value))
}

pub fn load_scenario(
    path: Option<&str>,
    overrides: &[(String, Decimal)],
) -> Result<ScenarioConfig, Box<dyn std::error::Error>> {
    let scenario = load_optional_input::<ScenarioConfig>(path)?.unwrap_or_else(default_scenario);
    Ok(overrides
        .iter()
        .fold(scenario, |s, (key, value)| s.with_parameter(key, *value)))
}

pub fn run_dashboard(args: DashboardArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario = load_scenario(args.input.as_deref(), &args.overrides)?;

    if args.full {
        let result = compute_plan(&scenario)?;
        return Ok(serde_json::to_value(result)?);
    }

    let mut collaborators =
        Collaborators::new(Box::new(scenario)).with_advisory(Box::new(StderrAdvisory));
    if let Some(path) = args.model_state.as_deref() {
        let state: ModelState = input::file::read_input(path)?;
        collaborators = collaborators.with_model_state(Box::new(CachedModelState(state)));
    }

    let mut dashboard = Dashboard::new(collaborators);
    let snapshot = dashboard.recompute();

    Ok(serde_json::json!({
        "result": snapshot,
        "methodology": format!("Dashboard snapshot ({:?})", snapshot.source),
        "warnings": snapshot.warnings,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("cogs_pct=0.3").unwrap(),
            ("cogs_pct".to_string(), dec!(0.3))
        );
        assert!(parse_override("cogs_pct").is_err());
        assert!(parse_override("wacc=0.1").is_err());
        assert!(parse_override("beta=high").is_err());
    }
}
