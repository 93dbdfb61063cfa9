pub mod engine;
pub mod payback;
pub mod wacc;

pub use engine::{value_cash_flows, ValuationInput, ValuationResult};
pub use payback::{payback_period, Payback};
pub use wacc::{resolve_discount_rates, DiscountRateInput, DiscountRates};
