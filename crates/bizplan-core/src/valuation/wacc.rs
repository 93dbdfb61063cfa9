use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::FinancialParams;
use crate::error::BizPlanError;
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::BizPlanResult;

/// Inputs for resolving the economic and equity discount rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountRateInput {
    pub risk_free_rate: Rate,
    /// Market return minus risk-free rate
    pub equity_risk_premium: Rate,
    /// Levered beta of equity
    pub beta: Decimal,
    pub country_risk_premium: Rate,
    /// Pre-tax cost of debt
    pub cost_of_debt: Rate,
    pub tax_rate: Rate,
    pub debt_weight: Rate,
    pub equity_weight: Rate,
    /// Explicit WACC; skips the CAPM build-up for the economic rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wacc_override: Option<Rate>,
    /// Explicit cost of equity for the financial series
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_of_equity_override: Option<Rate>,
}

impl From<&FinancialParams> for DiscountRateInput {
    fn from(fin: &FinancialParams) -> Self {
        Self {
            risk_free_rate: fin.risk_free_rate,
            equity_risk_premium: fin.equity_risk_premium,
            beta: fin.beta,
            country_risk_premium: fin.country_risk_premium,
            cost_of_debt: fin.cost_of_debt,
            tax_rate: fin.tax_rate,
            debt_weight: fin.debt_ratio,
            equity_weight: fin.equity_ratio,
            wacc_override: fin.discount_rate,
            cost_of_equity_override: fin.cost_of_equity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountRates {
    /// Rate applied to the economic (unlevered) series
    pub wacc: Rate,
    /// Rate applied to the financial (equity) series
    pub cost_of_equity: Rate,
    pub after_tax_cost_of_debt: Rate,
    /// CAPM build-up, reported even when an override is in force
    pub capm_cost_of_equity: Rate,
}

/// Resolve the WACC and cost of equity.
///
/// Ke = Rf + Beta * ERP + CRP
/// Kd_at = Kd * (1 - t)
/// WACC = Ke * We + Kd_at * Wd
///
/// Overrides take precedence over the build-up.
pub fn resolve_discount_rates(
    input: &DiscountRateInput,
) -> BizPlanResult<ComputationOutput<DiscountRates>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_discount_rate_input(input)?;

    let weight_sum = input.debt_weight + input.equity_weight;
    if (weight_sum - Decimal::ONE).abs() > dec!(0.01) {
        warnings.push(format!(
            "Debt and equity ratios sum to {weight_sum}, not 1.0; financing split will not cover CAPEX"
        ));
    }

    let capm_cost_of_equity = input.risk_free_rate
        + input.beta * input.equity_risk_premium
        + input.country_risk_premium;
    let after_tax_cost_of_debt = input.cost_of_debt * (Decimal::ONE - input.tax_rate);
    let built_wacc =
        capm_cost_of_equity * input.equity_weight + after_tax_cost_of_debt * input.debt_weight;

    let wacc = input.wacc_override.unwrap_or(built_wacc);
    let cost_of_equity = input.cost_of_equity_override.unwrap_or(capm_cost_of_equity);

    if input.beta > dec!(3.0) {
        warnings.push(format!(
            "High beta ({}): betas above 3.0 are unusual",
            input.beta
        ));
    }
    if wacc > dec!(0.30) {
        warnings.push(format!(
            "WACC of {wacc} exceeds 30%; appropriate for early-stage ventures only"
        ));
    }
    if cost_of_equity < wacc {
        warnings.push(format!(
            "Cost of equity ({cost_of_equity}) is below WACC ({wacc})"
        ));
    }

    let output = DiscountRates {
        wacc,
        cost_of_equity,
        after_tax_cost_of_debt,
        capm_cost_of_equity,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "WACC via CAPM build-up with country risk premium",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn validate_discount_rate_input(input: &DiscountRateInput) -> BizPlanResult<()> {
    if input.risk_free_rate < Decimal::ZERO {
        return Err(BizPlanError::InvalidInput {
            field: "risk_free_rate".into(),
            reason: "Risk-free rate cannot be negative".into(),
        });
    }
    if input.equity_risk_premium < Decimal::ZERO {
        return Err(BizPlanError::InvalidInput {
            field: "equity_risk_premium".into(),
            reason: "Equity risk premium cannot be negative".into(),
        });
    }
    if input.cost_of_debt < Decimal::ZERO {
        return Err(BizPlanError::InvalidInput {
            field: "cost_of_debt".into(),
            reason: "Cost of debt cannot be negative".into(),
        });
    }
    if input.tax_rate < Decimal::ZERO || input.tax_rate > Decimal::ONE {
        return Err(BizPlanError::InvalidInput {
            field: "tax_rate".into(),
            reason: "Tax rate must be between 0 and 1".into(),
        });
    }
    if input.debt_weight < Decimal::ZERO || input.equity_weight < Decimal::ZERO {
        return Err(BizPlanError::InvalidInput {
            field: "debt_ratio / equity_ratio".into(),
            reason: "Capital structure weights cannot be negative".into(),
        });
    }
    for (field, rate) in [
        ("discount_rate", input.wacc_override),
        ("cost_of_equity", input.cost_of_equity_override),
    ] {
        if let Some(r) = rate {
            if r <= dec!(-1) {
                return Err(BizPlanError::InvalidInput {
                    field: field.into(),
                    reason: "Discount rate must be greater than -100%".into(),
                });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
