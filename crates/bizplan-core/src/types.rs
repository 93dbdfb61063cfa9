use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BizPlanError;
use crate::BizPlanResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Calendar year of a projection period.
pub type Year = i32;

/// Multi-year planning window.
///
/// The first `pre_operating_years` years are investment years with no
/// revenue; the `operating_years` that follow carry the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionHorizon {
    pub start_year: Year,
    pub pre_operating_years: u32,
    pub operating_years: u32,
}

impl ProjectionHorizon {
    pub fn new(start_year: Year, pre_operating_years: u32, operating_years: u32) -> Self {
        Self {
            start_year,
            pre_operating_years,
            operating_years,
        }
    }

    pub fn total_years(&self) -> u32 {
        self.pre_operating_years + self.operating_years
    }

    /// Last calendar year covered by the horizon (inclusive).
    pub fn end_year(&self) -> Year {
        self.start_year + self.total_years() as Year - 1
    }

    pub fn first_operating_year(&self) -> Year {
        self.start_year + self.pre_operating_years as Year
    }

    pub fn years(&self) -> impl Iterator<Item = Year> {
        let start = self.start_year;
        (0..self.total_years()).map(move |i| start + i as Year)
    }

    pub fn operating_years(&self) -> impl Iterator<Item = Year> {
        let first = self.first_operating_year();
        (0..self.operating_years).map(move |i| first + i as Year)
    }

    pub fn is_pre_operating(&self, year: Year) -> bool {
        year >= self.start_year && year < self.first_operating_year()
    }

    pub fn contains(&self, year: Year) -> bool {
        year >= self.start_year && year <= self.end_year()
    }

    pub fn clamp(&self, year: Year) -> Year {
        year.clamp(self.start_year, self.end_year().max(self.start_year))
    }

    pub fn validate(&self) -> BizPlanResult<()> {
        if self.operating_years == 0 {
            return Err(BizPlanError::InvalidInput {
                field: "horizon.operating_years".into(),
                reason: "At least one operating year is required".into(),
            });
        }
        Ok(())
    }
}

/// Cash flows as the valuation engine consumes them: an initial outlay at
/// t = 0 followed by one flow per operating year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSeries {
    /// Total spent before operations start, as a positive amount
    pub initial_investment: Money,
    /// Operating-year flows, t = 1..n
    pub flows: Vec<Money>,
}

impl FlowSeries {
    pub fn new(initial_investment: Money, flows: Vec<Money>) -> Self {
        Self {
            initial_investment,
            flows,
        }
    }

    /// Flows with the initial outlay prefixed as a negative t = 0 entry.
    pub fn to_cash_flows(&self) -> Vec<Money> {
        let mut cfs = Vec::with_capacity(self.flows.len() + 1);
        cfs.push(-self.initial_investment);
        cfs.extend(self.flows.iter().copied());
        cfs
    }

    pub fn operating_total(&self) -> Money {
        self.flows.iter().copied().sum()
    }
}

/// Sensitivity variable specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityVariable {
    pub name: String,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
