pub mod aggregator;
pub mod defaults;
pub mod metrics;
pub mod pipeline;

pub use aggregator::{
    AdvisoryNotifier, Collaborators, Dashboard, DashboardSnapshot, ModelState, ModelStateSource,
    SnapshotSource, YearSummary,
};
pub use defaults::{default_scenario, default_snapshot};
pub use metrics::{break_even_year, roi, ValuationSnapshot};
pub use pipeline::{compute_plan, PlanModel};
