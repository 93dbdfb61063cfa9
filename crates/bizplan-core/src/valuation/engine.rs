use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::time_value::{checked_total, irr, npv, IrrMethod};
use crate::types::{with_metadata, ComputationOutput, FlowSeries, Money, Rate};
use crate::valuation::payback::{payback_period, Payback};
use crate::BizPlanResult;

/// A cash-flow series and the rate to discount it at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationInput {
    pub series: FlowSeries,
    pub discount_rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub npv: Money,
    pub irr: Rate,
    pub irr_method: IrrMethod,
    pub payback: Payback,
    pub discount_rate: Rate,
    /// Undiscounted sum of the operating flows
    pub operating_total: Money,
}

/// NPV, IRR and payback of one series.
pub fn value_cash_flows(input: &ValuationInput) -> BizPlanResult<ComputationOutput<ValuationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let cash_flows = input.series.to_cash_flows();
    checked_total(cash_flows.iter().map(|cf| cf.abs()), "cumulative cash position")?;
    let npv_value = npv(input.discount_rate, &cash_flows)?;
    let estimate = irr(&cash_flows);
    let payback = payback_period(&input.series);

    if estimate.method == IrrMethod::AnalyticFallback {
        warnings.push(format!(
            "IRR did not converge; analytic approximation {} reported",
            estimate.rate
        ));
    }
    if payback == Payback::Undetermined {
        warnings.push("Initial investment is not recovered; payback is undetermined".into());
    }
    if input.series.initial_investment.is_sign_negative() {
        warnings.push("Initial investment is negative; the series starts from a cash surplus".into());
    }

    tracing::debug!(
        npv = %npv_value,
        irr = %estimate.rate,
        ?payback,
        "cash flows valued"
    );

    let output = ValuationResult {
        npv: npv_value,
        irr: estimate.rate,
        irr_method: estimate.method,
        payback,
        discount_rate: input.discount_rate,
        operating_total: input.series.operating_total(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "NPV at the supplied rate, Newton-Raphson IRR with analytic fallback, interpolated payback",
        input,
        warnings,
        elapsed,
        output,
    ))
}
