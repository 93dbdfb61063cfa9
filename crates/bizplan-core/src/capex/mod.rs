pub mod allocator;

pub use allocator::{
    allocate_capex, CapexInput, CapexLine, CapexOutput, CapexPlan, FinancingSplit, InventoryPlan,
    YearlyCapex,
};
