use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::BizPlanError;
use crate::types::{with_metadata, ComputationOutput, Money, ProjectionHorizon, Rate, Year};
use crate::BizPlanResult;

pub const INVENTORY_LINE: &str = "inventory";

const DISTRIBUTION_TOLERANCE: Decimal = dec!(0.0001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A named CAPEX amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapexLine {
    pub name: String,
    pub amount: Money,
}

impl CapexLine {
    pub fn new(name: &str, amount: Money) -> Self {
        Self {
            name: name.to_string(),
            amount,
        }
    }
}

/// Opening stock purchase, bought in whole shipments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryPlan {
    /// Units (bottles) per shipping unit
    pub units_per_shipment: Decimal,
    /// Cost of one shipping unit
    pub cost_per_shipment: Money,
    /// Target stock, in thousands of units
    pub target_stock_thousand_units: Decimal,
}

/// How the base CAPEX and the inventory purchase spread over the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapexPlan {
    /// Base line items at their full-horizon amounts
    pub line_items: Vec<CapexLine>,
    /// Share of every base line item spent in each horizon year
    pub base_distribution: Vec<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<InventoryPlan>,
    /// Share of the inventory investment spent in each horizon year
    #[serde(default)]
    pub inventory_distribution: Vec<Rate>,
}

/// Input for the CAPEX allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapexInput {
    pub horizon: ProjectionHorizon,
    pub plan: CapexPlan,
    pub debt_ratio: Rate,
    pub equity_ratio: Rate,
}

/// One year of the CAPEX schedule. `total` is the sum of `lines`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyCapex {
    pub year: Year,
    pub lines: Vec<CapexLine>,
    pub total: Money,
}

impl YearlyCapex {
    pub fn line(&self, name: &str) -> Money {
        self.lines
            .iter()
            .filter(|l| l.name == name)
            .map(|l| l.amount)
            .sum()
    }
}

/// Debt / equity funding of one year's CAPEX.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingSplit {
    pub year: Year,
    pub total: Money,
    pub debt: Money,
    pub equity: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapexOutput {
    pub schedule: Vec<YearlyCapex>,
    pub financing: Vec<FinancingSplit>,
    /// Sum of the base line items before distribution
    pub base_capex_total: Money,
    pub shipments: Decimal,
    pub inventory_investment: Money,
    /// Sum of the schedule totals
    pub total_capex: Money,
    pub total_debt: Money,
    pub total_equity: Money,
}

impl CapexOutput {
    pub fn total_for(&self, year: Year) -> Money {
        self.schedule
            .iter()
            .find(|y| y.year == year)
            .map(|y| y.total)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn financing_for(&self, year: Year) -> Option<&FinancingSplit> {
        self.financing.iter().find(|f| f.year == year)
    }

    /// CAPEX spent before the first operating year.
    pub fn pre_operating_total(&self, horizon: &ProjectionHorizon) -> Money {
        self.schedule
            .iter()
            .filter(|y| horizon.is_pre_operating(y.year))
            .map(|y| y.total)
            .sum()
    }

    /// Equity funding spent before the first operating year.
    pub fn pre_operating_equity(&self, horizon: &ProjectionHorizon) -> Money {
        self.financing
            .iter()
            .filter(|f| horizon.is_pre_operating(f.year))
            .map(|f| f.equity)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Spread the base CAPEX and the inventory purchase over the horizon and
/// split each year between debt and equity.
pub fn allocate_capex(input: &CapexInput) -> BizPlanResult<ComputationOutput<CapexOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_capex_input(input)?;

    let n_years = input.horizon.total_years() as usize;
    let plan = &input.plan;

    check_distribution("base_distribution", &plan.base_distribution, n_years, &mut warnings);

    let (shipments, inventory_investment) = match &plan.inventory {
        Some(inv) => {
            check_distribution(
                "inventory_distribution",
                &plan.inventory_distribution,
                n_years,
                &mut warnings,
            );
            if inv.units_per_shipment.is_zero() && !inv.target_stock_thousand_units.is_zero() {
                warnings.push(
                    "units_per_shipment is zero; inventory investment treated as zero".into(),
                );
            }
            inventory_investment(inv)
        }
        None => (Decimal::ZERO, Decimal::ZERO),
    };

    let mut schedule = Vec::with_capacity(n_years);
    let mut financing = Vec::with_capacity(n_years);

    for (idx, year) in input.horizon.years().enumerate() {
        let base_share = share_at(&plan.base_distribution, idx);
        let mut lines: Vec<CapexLine> = plan
            .line_items
            .iter()
            .map(|item| CapexLine {
                name: item.name.clone(),
                amount: item.amount * base_share,
            })
            .collect();

        if plan.inventory.is_some() {
            let inv_share = share_at(&plan.inventory_distribution, idx);
            lines.push(CapexLine::new(INVENTORY_LINE, inventory_investment * inv_share));
        }

        let total: Money = lines.iter().map(|l| l.amount).sum();
        financing.push(FinancingSplit {
            year,
            total,
            debt: total * input.debt_ratio,
            equity: total * input.equity_ratio,
        });
        schedule.push(YearlyCapex { year, lines, total });
    }

    let base_capex_total: Money = plan.line_items.iter().map(|l| l.amount).sum();
    let total_capex: Money = schedule.iter().map(|y| y.total).sum();
    let total_debt: Money = financing.iter().map(|f| f.debt).sum();
    let total_equity: Money = financing.iter().map(|f| f.equity).sum();

    tracing::debug!(%total_capex, %inventory_investment, years = n_years, "capex allocated");

    let output = CapexOutput {
        schedule,
        financing,
        base_capex_total,
        shipments,
        inventory_investment,
        total_capex,
        total_debt,
        total_equity,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Progressive CAPEX allocation with debt/equity split",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Whole shipments needed to reach the target stock, and their cost.
pub fn inventory_investment(plan: &InventoryPlan) -> (Decimal, Money) {
    let required_units = plan.target_stock_thousand_units * dec!(1000);
    if plan.units_per_shipment.is_zero() || required_units.is_zero() {
        return (Decimal::ZERO, Decimal::ZERO);
    }
    let shipments = (required_units / plan.units_per_shipment).ceil();
    (shipments, shipments * plan.cost_per_shipment)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_capex_input(input: &CapexInput) -> BizPlanResult<()> {
    if let Some(inv) = &input.plan.inventory {
        if inv.units_per_shipment < Decimal::ZERO {
            return Err(BizPlanError::InvalidInput {
                field: "inventory.units_per_shipment".into(),
                reason: "Units per shipment cannot be negative".into(),
            });
        }
        if inv.target_stock_thousand_units < Decimal::ZERO {
            return Err(BizPlanError::InvalidInput {
                field: "inventory.target_stock_thousand_units".into(),
                reason: "Target stock cannot be negative".into(),
            });
        }
    }
    Ok(())
}

fn share_at(distribution: &[Rate], idx: usize) -> Rate {
    distribution.get(idx).copied().unwrap_or(Decimal::ZERO)
}

fn check_distribution(field: &str, shares: &[Rate], n_years: usize, warnings: &mut Vec<String>) {
    if shares.len() > n_years {
        warnings.push(format!(
            "{field} has {} entries for a {n_years}-year horizon; extra years ignored",
            shares.len()
        ));
    }
    let sum: Rate = shares.iter().take(n_years).copied().sum();
    if (sum - Decimal::ONE).abs() > DISTRIBUTION_TOLERANCE {
        tracing::warn!(%sum, field, "capex distribution does not sum to 100%");
        warnings.push(format!(
            "{field} sums to {:.2}% rather than 100%",
            sum * dec!(100)
        ));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn sample_input() -> CapexInput {
        CapexInput {
            horizon: ProjectionHorizon::new(2025, 1, 3),
            plan: CapexPlan {
                line_items: vec![
                    CapexLine::new("technology", dec!(500000)),
                    CapexLine::new("setup", dec!(300000)),
                ],
                base_distribution: vec![dec!(0.45), dec!(0.30), dec!(0.20), dec!(0.05)],
                inventory: Some(InventoryPlan {
                    units_per_shipment: dec!(1200),
                    cost_per_shipment: dec!(9000),
                    target_stock_thousand_units: dec!(50),
                }),
                inventory_distribution: vec![dec!(0.6), dec!(0.4)],
            },
            debt_ratio: dec!(0.6),
            equity_ratio: dec!(0.4),
        }
    }

    #[test]
    fn test_inventory_rounds_up_to_whole_shipments() {
        let plan = sample_input().plan.inventory.unwrap();
        let (shipments, cost) = inventory_investment(&plan);
        // 50,000 / 1,200 = 41.67 → 42 shipments
        assert_eq!(shipments, dec!(42));
        assert_eq!(cost, dec!(378000));
    }

    #[test]
    fn test_base_split_45_30_20_5() {
        let mut input = sample_input();
        input.plan.line_items = vec![CapexLine::new("base", dec!(800000))];
        input.plan.inventory = None;

        let out = allocate_capex(&input).unwrap().result;
        let totals: Vec<Money> = out.schedule.iter().map(|y| y.total).collect();
        assert_eq!(
            totals,
            vec![dec!(360000), dec!(240000), dec!(160000), dec!(40000)]
        );
        assert_eq!(out.total_capex, dec!(800000));
    }

    #[test]
    fn test_year_total_is_sum_of_lines() {
        let out = allocate_capex(&sample_input()).unwrap().result;
        for year in &out.schedule {
            let sum: Money = year.lines.iter().map(|l| l.amount).sum();
            assert_eq!(sum, year.total);
        }
        // 2025: 800,000 * 0.45 + 378,000 * 0.6
        assert_eq!(out.total_for(2025), dec!(360000) + dec!(226800));
        assert_eq!(out.schedule[0].line(INVENTORY_LINE), dec!(226800));
    }

    #[test]
    fn test_year_without_inventory_share() {
        let out = allocate_capex(&sample_input()).unwrap().result;
        assert_eq!(out.schedule[2].line(INVENTORY_LINE), Decimal::ZERO);
        assert_eq!(out.schedule[3].line(INVENTORY_LINE), Decimal::ZERO);
    }

    #[test]
    fn test_financing_split_sums_to_total() {
        let out = allocate_capex(&sample_input()).unwrap().result;
        for f in &out.financing {
            assert_eq!(f.debt + f.equity, f.total);
        }
        assert_eq!(out.total_debt + out.total_equity, out.total_capex);
    }

    #[test]
    fn test_pre_operating_totals() {
        let input = sample_input();
        let out = allocate_capex(&input).unwrap().result;
        assert_eq!(out.pre_operating_total(&input.horizon), out.total_for(2025));
        assert_eq!(
            out.pre_operating_equity(&input.horizon),
            out.total_for(2025) * dec!(0.4)
        );
    }

    #[test]
    fn test_zero_inventory_still_valid() {
        let mut input = sample_input();
        input.plan.inventory = Some(InventoryPlan {
            units_per_shipment: dec!(1200),
            cost_per_shipment: dec!(9000),
            target_stock_thousand_units: Decimal::ZERO,
        });
        let result = allocate_capex(&input).unwrap();
        assert_eq!(result.result.inventory_investment, Decimal::ZERO);
        assert_eq!(result.result.total_capex, dec!(800000));
    }

    #[test]
    fn test_distribution_mismatch_warns() {
        let mut input = sample_input();
        input.plan.base_distribution = vec![dec!(0.5), dec!(0.3)];
        let result = allocate_capex(&input).unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("base_distribution")));
    }

    #[test]
    fn test_negative_units_rejected() {
        let mut input = sample_input();
        if let Some(inv) = input.plan.inventory.as_mut() {
            inv.units_per_shipment = dec!(-1);
        }
        assert!(allocate_capex(&input).is_err());
    }
}
