use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::{ParameterSet, ScenarioConfig};
use crate::dashboard::{compute_plan, PlanModel};
use crate::error::BizPlanError;
use crate::types::*;
use crate::BizPlanResult;

/// Figure read from each recomputed plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMetric {
    Npv,
    Irr,
    PaybackMonths,
    Roi,
    FinancialNpv,
    FinancialIrr,
}

impl OutputMetric {
    /// `None` when the metric has no value for this plan (undetermined payback).
    pub fn read(&self, plan: &PlanModel) -> Option<Decimal> {
        let m = &plan.metrics;
        match self {
            OutputMetric::Npv => Some(m.npv),
            OutputMetric::Irr => Some(m.irr),
            OutputMetric::PaybackMonths => m.payback.months().map(Decimal::from),
            OutputMetric::Roi => Some(m.roi_pct),
            OutputMetric::FinancialNpv => Some(m.financial_npv),
            OutputMetric::FinancialIrr => Some(m.financial_irr),
        }
    }
}

/// Input for 2-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    /// Base case the overrides are applied to
    pub scenario: ScenarioConfig,
    /// First parameter to sweep (flat parameter key)
    pub variable_1: SensitivityVariable,
    /// Second parameter to sweep
    pub variable_2: SensitivityVariable,
    pub output_metric: OutputMetric,
}

/// Output of 2-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub variable_1_name: String,
    pub variable_2_name: String,
    pub variable_1_values: Vec<Decimal>,
    pub variable_2_values: Vec<Decimal>,
    pub output_metric: OutputMetric,
    /// Matrix[i][j] = output when variable_1 = variable_1_values[i], variable_2 = variable_2_values[j]
    pub matrix: Vec<Vec<Option<Decimal>>>,
    /// Output of the unmodified scenario
    pub base_case_value: Option<Decimal>,
    /// Grid cell closest to the scenario's own values (row, col)
    pub base_case_position: (usize, usize),
}

/// Row values, column values, cells and per-cell failure warnings.
pub type EvaluatedGrid = (Vec<Decimal>, Vec<Decimal>, Vec<Vec<Option<Decimal>>>, Vec<String>);

/// Generate the sweep values for a sensitivity variable from min to max with step.
fn generate_sweep_values(var: &SensitivityVariable) -> BizPlanResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(BizPlanError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(BizPlanError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Min must be <= max".into(),
        });
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current += var.step;
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    Ok(values)
}

/// Find the closest index to a target value in a sorted list.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn validate_variable(var: &SensitivityVariable) -> BizPlanResult<()> {
    if !ParameterSet::is_known_key(&var.name) {
        return Err(BizPlanError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Not a recognised parameter key".into(),
        });
    }
    Ok(())
}

/// Evaluate a 2-way grid with a caller-supplied model.
///
/// `eval_fn` receives (variable_1_value, variable_2_value). A failed cell
/// is recorded as `None` with a warning; the grid itself still completes.
pub fn evaluate_grid<F>(
    variable_1: &SensitivityVariable,
    variable_2: &SensitivityVariable,
    eval_fn: F,
) -> BizPlanResult<EvaluatedGrid>
where
    F: Fn(Decimal, Decimal) -> BizPlanResult<Option<Decimal>>,
{
    let v1_values = generate_sweep_values(variable_1)?;
    let v2_values = generate_sweep_values(variable_2)?;
    let mut warnings: Vec<String> = Vec::new();

    let mut matrix = Vec::with_capacity(v1_values.len());
    for v1 in &v1_values {
        let mut row = Vec::with_capacity(v2_values.len());
        for v2 in &v2_values {
            match eval_fn(*v1, *v2) {
                Ok(val) => row.push(val),
                Err(e) => {
                    warnings.push(format!(
                        "Evaluation failed at ({}={v1}, {}={v2}): {e}",
                        variable_1.name, variable_2.name
                    ));
                    row.push(None);
                }
            }
        }
        matrix.push(row);
    }

    Ok((v1_values, v2_values, matrix, warnings))
}

/// Sweep two parameters of a scenario and record one metric per cell.
pub fn run_sensitivity(
    input: &SensitivityInput,
) -> BizPlanResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();

    validate_variable(&input.variable_1)?;
    validate_variable(&input.variable_2)?;
    if input.variable_1.name == input.variable_2.name {
        return Err(BizPlanError::InvalidInput {
            field: "variable_2".into(),
            reason: "Both variables sweep the same parameter".into(),
        });
    }

    let metric = input.output_metric;
    let scenario = &input.scenario;
    let v1_name = input.variable_1.name.as_str();
    let v2_name = input.variable_2.name.as_str();

    let (v1_values, v2_values, matrix, mut warnings) =
        evaluate_grid(&input.variable_1, &input.variable_2, |v1, v2| {
            let cell = scenario
                .with_parameter(v1_name, v1)
                .with_parameter(v2_name, v2);
            let plan = compute_plan(&cell)?;
            Ok(metric.read(&plan.result))
        })?;

    let base_case_value = match compute_plan(scenario) {
        Ok(plan) => metric.read(&plan.result),
        Err(e) => {
            warnings.push(format!("Base case evaluation failed: {e}"));
            None
        }
    };

    let params = &scenario.parameters;
    let target_1 = params
        .resolved(v1_name)?
        .unwrap_or((input.variable_1.min + input.variable_1.max) / dec!(2));
    let target_2 = params
        .resolved(v2_name)?
        .unwrap_or((input.variable_2.min + input.variable_2.max) / dec!(2));
    let base_row = closest_index(&v1_values, target_1);
    let base_col = closest_index(&v2_values, target_2);

    tracing::debug!(
        rows = v1_values.len(),
        cols = v2_values.len(),
        failed = warnings.len(),
        "sensitivity grid evaluated"
    );

    let output = SensitivityOutput {
        variable_1_name: input.variable_1.name.clone(),
        variable_2_name: input.variable_2.name.clone(),
        variable_1_values: v1_values,
        variable_2_values: v2_values,
        output_metric: metric,
        matrix,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way Sensitivity Analysis over plan parameters",
        &serde_json::json!({
            "scenario": scenario.name,
            "variable_1": input.variable_1,
            "variable_2": input.variable_2,
            "output_metric": metric,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::default_scenario;

    fn variable(name: &str, min: Decimal, max: Decimal, step: Decimal) -> SensitivityVariable {
        SensitivityVariable {
            name: name.into(),
            min,
            max,
            step,
        }
    }

    fn sample_input() -> SensitivityInput {
        SensitivityInput {
            scenario: default_scenario(),
            variable_1: variable("discount_rate", dec!(0.08), dec!(0.12), dec!(0.02)),
            variable_2: variable("avg_ticket", dec!(40), dec!(60), dec!(10)),
            output_metric: OutputMetric::Npv,
        }
    }

    #[test]
    fn test_grid_dimensions() {
        let result = run_sensitivity(&sample_input()).unwrap();
        let out = &result.result;
        assert_eq!(out.variable_1_values, vec![dec!(0.08), dec!(0.10), dec!(0.12)]);
        assert_eq!(out.variable_2_values, vec![dec!(40), dec!(50), dec!(60)]);
        assert_eq!(out.matrix.len(), 3);
        assert!(out.matrix.iter().all(|row| row.len() == 3));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_npv_falls_with_rate_and_rises_with_ticket() {
        let out = run_sensitivity(&sample_input()).unwrap().result;
        let cell = |i: usize, j: usize| out.matrix[i][j].unwrap();
        for j in 0..3 {
            assert!(cell(0, j) > cell(1, j));
            assert!(cell(1, j) > cell(2, j));
        }
        for i in 0..3 {
            assert!(cell(i, 0) < cell(i, 1));
            assert!(cell(i, 1) < cell(i, 2));
        }
    }

    #[test]
    fn test_base_case_position_uses_scenario_values() {
        let mut input = sample_input();
        input.variable_1 = variable("tax_rate", dec!(0.15), dec!(0.35), dec!(0.05));
        let out = run_sensitivity(&input).unwrap().result;
        // default tax 25% -> index 2; default ticket 50 -> index 1
        assert_eq!(out.base_case_position, (2, 1));
        let cell = out.matrix[2][1].unwrap();
        let base = out.base_case_value.unwrap();
        assert!(
            (cell - base).abs() < dec!(0.01),
            "Base cell {cell} should match base case {base}"
        );
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let mut input = sample_input();
        input.variable_1.name = "wacc".into();
        assert!(run_sensitivity(&input).is_err());
    }

    #[test]
    fn test_failed_cells_are_none() {
        let v1 = variable("a", dec!(0), dec!(2), dec!(1));
        let v2 = variable("b", dec!(0), dec!(1), dec!(1));
        let (_, _, matrix, warnings) = evaluate_grid(&v1, &v2, |a, b| {
            if a == dec!(1) {
                return Err(BizPlanError::DivisionByZero {
                    context: "test model".into(),
                });
            }
            Ok(Some(a + b))
        })
        .unwrap();
        assert_eq!(matrix[1], vec![None, None]);
        assert_eq!(matrix[2][1], Some(dec!(3)));
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_sweep_with_non_exact_step() {
        let var = variable("test", dec!(0), dec!(1), dec!(0.3));
        let vals = generate_sweep_values(&var).unwrap();
        // 0, 0.3, 0.6, 0.9, 1.0 (max appended)
        assert_eq!(vals.len(), 5);
        assert_eq!(*vals.last().unwrap(), dec!(1));
    }

    #[test]
    fn test_invalid_step() {
        let var = variable("bad", dec!(0), dec!(1), dec!(0));
        assert!(generate_sweep_values(&var).is_err());
    }
}
