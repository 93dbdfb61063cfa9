pub mod capex;
pub mod cash_flow;
pub mod config;
pub mod error;
pub mod revenue;
pub mod time_value;
pub mod types;
pub mod valuation;

#[cfg(feature = "dashboard")]
pub mod dashboard;

#[cfg(feature = "sensitivity")]
pub mod scenarios;

pub use error::BizPlanError;
pub use types::*;

/// Standard result type for all bizplan operations
pub type BizPlanResult<T> = Result<T, BizPlanError>;
