//! Static fallback data published when a recompute fails.
//!
//! The figures are the base-case plan (default parameters, one market,
//! 800,000 of CAPEX spread 45/30/20/5) rounded to whole currency units.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::capex::{CapexLine, CapexPlan};
use crate::config::{Market, MarketScope, MarketTable, ParameterSet, ScenarioConfig};
use crate::dashboard::aggregator::{DashboardSnapshot, SnapshotSource, YearSummary};
use crate::dashboard::metrics::ValuationSnapshot;
use crate::types::{Money, ProjectionHorizon};
use crate::valuation::Payback;

const DEFAULT_HORIZON: ProjectionHorizon = ProjectionHorizon {
    start_year: 2025,
    pre_operating_years: 1,
    operating_years: 4,
};

/// year, capex, debt, equity, revenue, ebitda, fcf, cumulative fcf, equity flow
const DEFAULT_YEARS: [(i32, i64, i64, i64, i64, i64, i64, i64, i64); 5] = [
    (2025, 360_000, 216_000, 144_000, 0, 0, -360_000, -360_000, -144_000),
    (2026, 240_000, 144_000, 96_000, 174_600, 69_840, -170_160, -530_160, -135_120),
    (2027, 160_000, 96_000, 64_000, 329_994, 131_998, -28_002, -558_162, -43_842),
    (2028, 40_000, 24_000, 16_000, 622_274, 248_910, 186_682, -371_480, 98_842),
    (2029, 0, 0, 0, 1_171_007, 468_403, 391_302, 19_822, 283_782),
];

const DEFAULT_CAPEX: [(&str, i64); 3] = [
    ("technology", 350_000),
    ("fit_out", 300_000),
    ("working_capital", 150_000),
];

const DEFAULT_DISTRIBUTION: [Decimal; 4] = [dec!(0.45), dec!(0.30), dec!(0.20), dec!(0.05)];

/// The base-case scenario the default snapshot was computed from.
pub fn default_scenario() -> ScenarioConfig {
    ScenarioConfig {
        name: "default".into(),
        horizon: DEFAULT_HORIZON,
        parameters: ParameterSet::new(),
        markets: MarketTable::new(vec![Market::new(
            "default",
            "Default market",
            Decimal::ONE,
            Decimal::ONE,
        )]),
        scope: MarketScope::All,
        capex: CapexPlan {
            line_items: DEFAULT_CAPEX
                .iter()
                .map(|(name, amount)| CapexLine::new(name, Decimal::from(*amount)))
                .collect(),
            base_distribution: DEFAULT_DISTRIBUTION.to_vec(),
            inventory: None,
            inventory_distribution: Vec::new(),
        },
    }
}

/// A complete snapshot built from static tables only.
pub fn default_snapshot() -> DashboardSnapshot {
    let years: Vec<YearSummary> = DEFAULT_YEARS
        .iter()
        .map(
            |&(year, capex, debt, equity, revenue, ebitda, fcf, cumulative_fcf, equity_flow)| {
                YearSummary {
                    year,
                    capex: Decimal::from(capex),
                    debt: Decimal::from(debt),
                    equity: Decimal::from(equity),
                    revenue: Decimal::from(revenue),
                    ebitda: Decimal::from(ebitda),
                    fcf: Decimal::from(fcf),
                    cumulative_fcf: Decimal::from(cumulative_fcf),
                    equity_flow: Decimal::from(equity_flow),
                }
            },
        )
        .collect();

    let total_capex: Money = years.iter().map(|y| y.capex).sum();
    let total_debt: Money = years.iter().map(|y| y.debt).sum();
    let total_equity: Money = years.iter().map(|y| y.equity).sum();

    DashboardSnapshot {
        source: SnapshotSource::Defaults,
        computed_at: Utc::now(),
        horizon: DEFAULT_HORIZON,
        total_capex,
        total_debt,
        total_equity,
        revenue_cagr: dec!(0.8858),
        years,
        valuation: ValuationSnapshot {
            npv: dec!(-116841),
            irr: dec!(0.0107),
            payback: Payback::Determined { months: 47 },
            roi_pct: dec!(47.48),
            break_even_year: Some(2029),
            financial_npv: dec!(-56615),
            financial_irr: dec!(0.0570),
        },
        warnings: Vec::new(),
    }
}
