use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::FlowSeries;

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Months until the cumulative cash position recovers the initial investment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Payback {
    /// Recovered after `months`, counted from the start of the first operating year
    Determined { months: u32 },
    /// Never recovered and the final run-rate does not recover it either
    Undetermined,
}

impl Payback {
    pub fn months(&self) -> Option<u32> {
        match self {
            Payback::Determined { months } => Some(*months),
            Payback::Undetermined => None,
        }
    }

    pub fn is_determined(&self) -> bool {
        matches!(self, Payback::Determined { .. })
    }
}

/// Interpolated payback period of a cash-flow series.
///
/// Cumulative cash starts at `-initial_investment` and each operating year's
/// flow is added in order. In the year the position turns non-negative the
/// fraction of the year needed is `|previous cumulative| / flow`. A position
/// that never goes negative pays back at 0 months. When the horizon ends short
/// of recovery the last flow is extrapolated, but only if it is positive.
pub fn payback_period(series: &FlowSeries) -> Payback {
    let mut cumulative = -series.initial_investment;
    let mut ever_negative = cumulative < Decimal::ZERO;

    for (i, fcf) in series.flows.iter().enumerate() {
        let previous = cumulative;
        cumulative += *fcf;
        ever_negative |= cumulative < Decimal::ZERO;
        if cumulative >= Decimal::ZERO && previous < Decimal::ZERO {
            let into_year = previous.abs() / *fcf * MONTHS_PER_YEAR;
            return to_months(Decimal::from(i as u64) * MONTHS_PER_YEAR + into_year);
        }
    }

    if !ever_negative {
        return Payback::Determined { months: 0 };
    }

    match series.flows.last() {
        Some(last) if *last > Decimal::ZERO => {
            let elapsed = Decimal::from(series.flows.len() as u64) * MONTHS_PER_YEAR;
            let remaining = cumulative.abs() / *last * MONTHS_PER_YEAR;
            to_months(elapsed + remaining)
        }
        _ => Payback::Undetermined,
    }
}

fn to_months(months: Decimal) -> Payback {
    months
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .map_or(Payback::Undetermined, |months| Payback::Determined { months })
}
