use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::capex::{allocate_capex, CapexInput, CapexOutput};
use crate::cash_flow::{derive_cash_flows, CashFlowInput, CashFlowOutput};
use crate::config::ParameterSource;
use crate::dashboard::metrics::ValuationSnapshot;
use crate::revenue::{project_revenue, RevenueInput, RevenueProjection};
use crate::types::{with_metadata, ComputationOutput, ProjectionHorizon};
use crate::valuation::{
    resolve_discount_rates, value_cash_flows, DiscountRateInput, DiscountRates, ValuationInput,
    ValuationResult,
};
use crate::BizPlanResult;

/// Every stage output of one recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanModel {
    pub horizon: ProjectionHorizon,
    pub capex: CapexOutput,
    pub revenue: RevenueProjection,
    pub cash_flows: CashFlowOutput,
    pub rates: DiscountRates,
    pub economic: ValuationResult,
    pub financial: ValuationResult,
    pub metrics: ValuationSnapshot,
}

/// Run configuration, CAPEX, revenue, cash flow and valuation in order.
///
/// Each stage consumes the previous stage's output; the first error stops
/// the run. Stage warnings are collected into the returned envelope.
pub fn compute_plan(source: &dyn ParameterSource) -> BizPlanResult<ComputationOutput<PlanModel>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let horizon = source.horizon();
    horizon.validate()?;
    let fin = source.financial_params()?;
    let biz = source.business_params()?;
    let scoped = source.active_markets()?;
    warnings.extend(scoped.warnings);

    let capex = allocate_capex(&CapexInput {
        horizon,
        plan: source.capex_plan().clone(),
        debt_ratio: fin.debt_ratio,
        equity_ratio: fin.equity_ratio,
    })?;
    warnings.extend(capex.warnings);
    let capex = capex.result;

    let revenue = project_revenue(&RevenueInput {
        horizon,
        business: biz.clone(),
        markets: scoped.table,
    })?;
    warnings.extend(revenue.warnings);
    let revenue = revenue.result;

    let cash_flows = derive_cash_flows(&CashFlowInput::from_parts(
        horizon, &revenue, &capex, &fin, &biz,
    ))?;
    warnings.extend(cash_flows.warnings);
    let cash_flows = cash_flows.result;

    let rates = resolve_discount_rates(&DiscountRateInput::from(&fin))?;
    warnings.extend(rates.warnings);
    let rates = rates.result;

    let economic_series = cash_flows.economic.series();
    let economic = value_cash_flows(&ValuationInput {
        series: economic_series.clone(),
        discount_rate: rates.wacc,
    })?;
    warnings.extend(economic.warnings.into_iter().map(|w| format!("economic: {w}")));
    let economic = economic.result;

    let financial = value_cash_flows(&ValuationInput {
        series: cash_flows.financial.series(),
        discount_rate: rates.cost_of_equity,
    })?;
    warnings.extend(financial.warnings.into_iter().map(|w| format!("financial: {w}")));
    let financial = financial.result;

    let metrics = ValuationSnapshot::from_results(
        &horizon,
        &economic_series,
        capex.total_capex,
        &economic,
        &financial,
    );

    tracing::debug!(
        npv = %metrics.npv,
        irr = %metrics.irr,
        roi = %metrics.roi_pct,
        warnings = warnings.len(),
        "plan computed"
    );

    let model = PlanModel {
        horizon,
        capex,
        revenue,
        cash_flows,
        rates,
        economic,
        financial,
        metrics,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "CAPEX allocation -> revenue projection -> FCF derivation -> NPV / IRR / payback",
        &serde_json::json!({
            "horizon": horizon,
            "parameters": source.parameter_set(),
        }),
        warnings,
        elapsed,
        model,
    ))
}
