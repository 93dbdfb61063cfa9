pub mod sensitivity;

pub use sensitivity::{
    evaluate_grid, run_sensitivity, OutputMetric, SensitivityInput, SensitivityOutput,
};
