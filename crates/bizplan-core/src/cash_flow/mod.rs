pub mod derivation;

pub use derivation::{
    derive_cash_flows, CashFlowInput, CashFlowOutput, CashFlowYear, CostAssumptions,
    EconomicCashFlows, FinancialCashFlows, FinancialFlowYear, YearAmount,
};
