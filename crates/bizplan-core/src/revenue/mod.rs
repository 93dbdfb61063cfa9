pub mod projector;

pub use projector::{
    cagr, conversion_at, project_revenue, MarketRevenue, RevenueInput, RevenueProjection, YearRevenue,
};
