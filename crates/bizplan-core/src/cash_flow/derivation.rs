use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::capex::{CapexOutput, FinancingSplit, YearlyCapex};
use crate::config::{BusinessParams, FinancialParams};
use crate::error::BizPlanError;
use crate::revenue::RevenueProjection;
use crate::time_value::{checked_product, checked_total, growth_factor};
use crate::types::{
    with_metadata, ComputationOutput, FlowSeries, Money, ProjectionHorizon, Rate, Year,
};
use crate::BizPlanResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearAmount {
    pub year: Year,
    pub amount: Money,
}

/// Cost structure applied to net revenue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostAssumptions {
    pub cogs_pct: Rate,
    pub operating_expenses_pct: Rate,
    pub marketing_pct: Rate,
    /// Fixed payroll in the first operating year, escalated by `inflation`
    pub sales_salary: Money,
    pub inflation: Rate,
    pub tax_rate: Rate,
    pub depreciation_years: Decimal,
}

impl CostAssumptions {
    pub fn from_params(fin: &FinancialParams, biz: &BusinessParams) -> Self {
        Self {
            cogs_pct: fin.cogs_pct,
            operating_expenses_pct: fin.operating_expenses_pct,
            marketing_pct: biz.marketing_pct,
            sales_salary: biz.sales_salary,
            inflation: biz.inflation,
            tax_rate: fin.tax_rate,
            depreciation_years: fin.depreciation_years,
        }
    }
}

/// Input for deriving the free-cash-flow series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowInput {
    pub horizon: ProjectionHorizon,
    /// Net revenue per operating year
    pub revenue: Vec<YearAmount>,
    pub capex: Vec<YearlyCapex>,
    pub financing: Vec<FinancingSplit>,
    pub costs: CostAssumptions,
    /// Pre-tax interest rate on the drawn debt
    pub cost_of_debt: Rate,
    /// Years of level principal repayment from the first operating year
    pub debt_term_years: Decimal,
}

impl CashFlowInput {
    /// Assemble the input from upstream stage outputs.
    pub fn from_parts(
        horizon: ProjectionHorizon,
        revenue: &RevenueProjection,
        capex: &CapexOutput,
        fin: &FinancialParams,
        biz: &BusinessParams,
    ) -> Self {
        Self {
            horizon,
            revenue: revenue
                .years
                .iter()
                .map(|y| YearAmount {
                    year: y.year,
                    amount: y.net_revenue,
                })
                .collect(),
            capex: capex.schedule.clone(),
            financing: capex.financing.clone(),
            costs: CostAssumptions::from_params(fin, biz),
            cost_of_debt: fin.cost_of_debt,
            debt_term_years: fin.debt_term_years,
        }
    }
}

/// Unlevered cash flow for one operating year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowYear {
    pub year: Year,
    pub revenue: Money,
    pub cogs: Money,
    pub gross_profit: Money,
    pub operating_expenses: Money,
    pub ebitda: Money,
    pub depreciation: Money,
    pub ebit: Money,
    /// Zero when EBIT is negative (no loss carry-back)
    pub taxes: Money,
    pub nopat: Money,
    pub capex: Money,
    /// NOPAT + depreciation - CAPEX
    pub fcf: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicCashFlows {
    /// CAPEX spent before operations start
    pub initial_investment: Money,
    pub years: Vec<CashFlowYear>,
}

impl EconomicCashFlows {
    pub fn series(&self) -> FlowSeries {
        FlowSeries::new(
            self.initial_investment,
            self.years.iter().map(|y| y.fcf).collect(),
        )
    }
}

/// Equity holder's view of one operating year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialFlowYear {
    pub year: Year,
    pub fcf: Money,
    /// Debt drawn this year to fund CAPEX
    pub debt_drawdown: Money,
    pub opening_debt: Money,
    pub interest: Money,
    pub after_tax_interest: Money,
    pub principal: Money,
    pub closing_debt: Money,
    /// fcf + drawdown - after-tax interest - principal
    pub equity_flow: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialCashFlows {
    /// Equity funding spent before operations start
    pub initial_investment: Money,
    /// Debt drawn before operations start
    pub pre_operating_debt: Money,
    pub years: Vec<FinancialFlowYear>,
}

impl FinancialCashFlows {
    pub fn series(&self) -> FlowSeries {
        FlowSeries::new(
            self.initial_investment,
            self.years.iter().map(|y| y.equity_flow).collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowOutput {
    pub economic: EconomicCashFlows,
    pub financial: FinancialCashFlows,
    pub depreciable_base: Money,
    pub annual_depreciation: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive the economic (unlevered) and financial (equity) cash-flow series.
pub fn derive_cash_flows(input: &CashFlowInput) -> BizPlanResult<ComputationOutput<CashFlowOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_cash_flow_input(input)?;

    let costs = &input.costs;
    let depreciable_base =
        checked_total(input.capex.iter().map(|y| y.total), "depreciable base")?;
    let annual_depreciation = if costs.depreciation_years > Decimal::ZERO {
        depreciable_base
            .checked_div(costs.depreciation_years)
            .ok_or_else(|| BizPlanError::Overflow {
                context: "annual depreciation".into(),
            })?
    } else {
        Decimal::ZERO
    };

    // --- Economic series ---
    let mut years = Vec::with_capacity(input.horizon.operating_years as usize);
    let mut accumulated_depreciation = Decimal::ZERO;

    for (t, year) in input.horizon.operating_years().enumerate() {
        let ctx = |what: &str| format!("{what} in {year}");
        let revenue = amount_for(&input.revenue, year);
        let cogs = checked_product(revenue, costs.cogs_pct, &ctx("COGS"))?;
        let gross_profit = checked_sub(revenue, cogs, &ctx("gross profit"))?;
        let fixed_payroll = checked_product(
            costs.sales_salary,
            growth_factor(costs.inflation, t as u32)?,
            &ctx("payroll"),
        )?;
        let operating_expenses = checked_total(
            [
                checked_product(revenue, costs.operating_expenses_pct, &ctx("opex"))?,
                checked_product(revenue, costs.marketing_pct, &ctx("marketing"))?,
                fixed_payroll,
            ],
            &ctx("operating expenses"),
        )?;
        let ebitda = checked_sub(gross_profit, operating_expenses, &ctx("EBITDA"))?;

        let depreciation = annual_depreciation
            .min(depreciable_base - accumulated_depreciation)
            .max(Decimal::ZERO);
        accumulated_depreciation += depreciation;

        let ebit = checked_sub(ebitda, depreciation, &ctx("EBIT"))?;
        let taxes = checked_product(ebit, costs.tax_rate, &ctx("taxes"))?.max(Decimal::ZERO);
        let nopat = checked_sub(ebit, taxes, &ctx("NOPAT"))?;
        let capex = capex_for(&input.capex, year);
        let fcf = checked_sub(
            checked_total([nopat, depreciation], &ctx("free cash flow"))?,
            capex,
            &ctx("free cash flow"),
        )?;

        years.push(CashFlowYear {
            year,
            revenue,
            cogs,
            gross_profit,
            operating_expenses,
            ebitda,
            depreciation,
            ebit,
            taxes,
            nopat,
            capex,
            fcf,
        });
    }

    let initial_investment: Money = input
        .capex
        .iter()
        .filter(|y| input.horizon.is_pre_operating(y.year))
        .map(|y| y.total)
        .sum();

    // Every running total over the series (payback, break-even, ROI) stays in range
    checked_total(
        std::iter::once(initial_investment).chain(years.iter().map(|y| y.fcf.abs())),
        "cumulative free cash flow",
    )?;

    let economic = EconomicCashFlows {
        initial_investment,
        years,
    };

    // --- Financial series ---
    let financial = build_financial_flows(input, &economic, &mut warnings)?;

    if economic.years.iter().all(|y| y.fcf <= Decimal::ZERO) {
        warnings.push("No operating year generates positive free cash flow".into());
    }

    tracing::debug!(
        %initial_investment,
        %depreciable_base,
        operating_years = economic.years.len(),
        "cash flows derived"
    );

    let output = CashFlowOutput {
        economic,
        financial,
        depreciable_base,
        annual_depreciation,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "FCF = NOPAT + D&A - CAPEX; equity flows after level-amortising debt service",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn build_financial_flows(
    input: &CashFlowInput,
    economic: &EconomicCashFlows,
    warnings: &mut Vec<String>,
) -> BizPlanResult<FinancialCashFlows> {
    let horizon = &input.horizon;
    let total_debt: Money = input.financing.iter().map(|f| f.debt).sum();
    let pre_operating_debt: Money = input
        .financing
        .iter()
        .filter(|f| horizon.is_pre_operating(f.year))
        .map(|f| f.debt)
        .sum();
    let initial_investment: Money = input
        .financing
        .iter()
        .filter(|f| horizon.is_pre_operating(f.year))
        .map(|f| f.equity)
        .sum();

    let level_principal = if input.debt_term_years > Decimal::ZERO {
        total_debt / input.debt_term_years
    } else {
        if total_debt > Decimal::ZERO {
            warnings.push("debt_term_years is zero; debt is carried interest-only".into());
        }
        Decimal::ZERO
    };

    let after_tax_factor = Decimal::ONE - input.costs.tax_rate;
    let mut balance = pre_operating_debt;
    let mut years = Vec::with_capacity(economic.years.len());

    for cf in &economic.years {
        let opening_debt = balance;
        let ctx = |what: &str| format!("{what} in {}", cf.year);
        let interest = checked_product(opening_debt, input.cost_of_debt, &ctx("interest"))?;
        let debt_drawdown = input
            .financing
            .iter()
            .find(|f| f.year == cf.year)
            .map(|f| f.debt)
            .unwrap_or(Decimal::ZERO);
        balance += debt_drawdown;
        let principal = level_principal.min(balance).max(Decimal::ZERO);
        balance -= principal;
        let after_tax_interest =
            checked_product(interest, after_tax_factor, &ctx("after-tax interest"))?;
        let equity_flow = checked_sub(
            checked_total([cf.fcf, debt_drawdown], &ctx("equity flow"))?,
            checked_total([after_tax_interest, principal], &ctx("debt service"))?,
            &ctx("equity flow"),
        )?;

        years.push(FinancialFlowYear {
            year: cf.year,
            fcf: cf.fcf,
            debt_drawdown,
            opening_debt,
            interest,
            after_tax_interest,
            principal,
            closing_debt: balance,
            equity_flow,
        });
    }

    checked_total(
        std::iter::once(initial_investment).chain(years.iter().map(|y| y.equity_flow.abs())),
        "cumulative equity flow",
    )?;

    if balance > Decimal::ZERO {
        warnings.push(format!(
            "Debt of {balance} remains outstanding at the end of the horizon"
        ));
    }

    Ok(FinancialCashFlows {
        initial_investment,
        pre_operating_debt,
        years,
    })
}

fn checked_sub(a: Money, b: Money, context: &str) -> BizPlanResult<Money> {
    a.checked_sub(b).ok_or_else(|| BizPlanError::Overflow {
        context: context.to_string(),
    })
}

fn amount_for(amounts: &[YearAmount], year: Year) -> Money {
    amounts
        .iter()
        .find(|a| a.year == year)
        .map(|a| a.amount)
        .unwrap_or(Decimal::ZERO)
}

fn capex_for(schedule: &[YearlyCapex], year: Year) -> Money {
    schedule
        .iter()
        .find(|y| y.year == year)
        .map(|y| y.total)
        .unwrap_or(Decimal::ZERO)
}

fn validate_cash_flow_input(input: &CashFlowInput) -> BizPlanResult<()> {
    input.horizon.validate()?;
    if input.costs.depreciation_years < Decimal::ZERO {
        return Err(BizPlanError::InvalidInput {
            field: "depreciation_years".into(),
            reason: "Useful life cannot be negative".into(),
        });
    }
    if input.debt_term_years < Decimal::ZERO {
        return Err(BizPlanError::InvalidInput {
            field: "debt_term_years".into(),
            reason: "Debt term cannot be negative".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
