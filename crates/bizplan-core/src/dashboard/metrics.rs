use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{FlowSeries, Money, ProjectionHorizon, Rate, Year};
use crate::valuation::{Payback, ValuationResult};

/// Headline figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSnapshot {
    pub npv: Money,
    pub irr: Rate,
    pub payback: Payback,
    /// Operating FCF over total CAPEX, in percent
    pub roi_pct: Decimal,
    pub break_even_year: Option<Year>,
    pub financial_npv: Money,
    pub financial_irr: Rate,
}

impl ValuationSnapshot {
    pub fn from_results(
        horizon: &ProjectionHorizon,
        economic_series: &FlowSeries,
        total_capex: Money,
        economic: &ValuationResult,
        financial: &ValuationResult,
    ) -> Self {
        Self {
            npv: economic.npv,
            irr: economic.irr,
            payback: economic.payback,
            roi_pct: roi(economic_series.operating_total(), total_capex),
            break_even_year: break_even_year(horizon, economic_series, economic.payback),
            financial_npv: financial.npv,
            financial_irr: financial.irr,
        }
    }
}

/// `operating_fcf / total_capex * 100`, zero when there is no CAPEX or the
/// ratio leaves the Decimal range.
pub fn roi(operating_fcf: Money, total_capex: Money) -> Decimal {
    if total_capex <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    operating_fcf
        .checked_div(total_capex)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .unwrap_or(Decimal::ZERO)
}

/// First operating year whose cumulative position, net of pre-operating
/// CAPEX, is non-negative. Falls back to `start_year + ceil(months / 12)`
/// clamped to the horizon, and to `None` when payback is undetermined.
pub fn break_even_year(
    horizon: &ProjectionHorizon,
    series: &FlowSeries,
    payback: Payback,
) -> Option<Year> {
    let mut cumulative = -series.initial_investment;
    for (year, fcf) in horizon.operating_years().zip(series.flows.iter()) {
        cumulative += *fcf;
        if cumulative >= Decimal::ZERO {
            return Some(year);
        }
    }

    payback.months().map(|months| {
        let years = months.div_ceil(12) as Year;
        horizon.clamp(horizon.start_year.saturating_add(years))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roi_zero_capex() {
        assert_eq!(roi(dec!(500000), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_roi_out_of_range_is_zero() {
        assert_eq!(roi(Decimal::MAX, dec!(0.001)), Decimal::ZERO);
    }

    #[test]
    fn test_roi_percent() {
        assert_eq!(roi(dec!(1200000), dec!(800000)), dec!(150));
    }

    #[test]
    fn test_break_even_within_horizon() {
        let h = ProjectionHorizon::new(2025, 1, 4);
        let s = FlowSeries::new(dec!(1000), vec![dec!(200), dec!(400), dec!(500), dec!(500)]);
        assert_eq!(
            break_even_year(&h, &s, Payback::Determined { months: 31 }),
            Some(2028)
        );
    }

    #[test]
    fn test_break_even_falls_back_to_payback_clamped() {
        let h = ProjectionHorizon::new(2025, 1, 2);
        let s = FlowSeries::new(dec!(1000), vec![dec!(100), dec!(100)]);
        // 100 months -> 2025 + 9, clamped to 2027
        assert_eq!(
            break_even_year(&h, &s, Payback::Determined { months: 100 }),
            Some(2027)
        );
    }

    #[test]
    fn test_break_even_undetermined() {
        let h = ProjectionHorizon::new(2025, 1, 2);
        let s = FlowSeries::new(dec!(1000), vec![dec!(-100), dec!(-100)]);
        assert_eq!(break_even_year(&h, &s, Payback::Undetermined), None);
    }
}
