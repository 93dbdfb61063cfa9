pub mod markets;
pub mod params;
pub mod scenario;

pub use markets::{Market, MarketScope, MarketTable, ScopedMarkets};
pub use params::{BusinessParams, FinancialParams, ParameterSet};
pub use scenario::{ParameterSource, ScenarioConfig};
