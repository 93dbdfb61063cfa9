use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::capex::allocator::CapexPlan;
use crate::error::BizPlanError;
use crate::types::ProjectionHorizon;
use crate::BizPlanResult;

use super::markets::{MarketScope, MarketTable, ScopedMarkets};
use super::params::{BusinessParams, FinancialParams, ParameterSet};

/// Supplies the named parameters a recompute runs on.
///
/// Implemented by [`ScenarioConfig`]; dashboards can plug in their own
/// source (form state, remote config) behind the same contract.
pub trait ParameterSource {
    fn parameter_set(&self) -> &ParameterSet;

    fn horizon(&self) -> ProjectionHorizon;

    fn capex_plan(&self) -> &CapexPlan;

    /// Markets taking part, weights already rescaled to the active subset.
    fn active_markets(&self) -> BizPlanResult<ScopedMarkets>;

    fn financial_params(&self) -> BizPlanResult<FinancialParams> {
        self.parameter_set().financial()
    }

    fn business_params(&self) -> BizPlanResult<BusinessParams> {
        self.parameter_set().business()
    }
}

/// A complete scenario as read from a JSON or YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub horizon: ProjectionHorizon,
    #[serde(default)]
    pub parameters: ParameterSet,
    pub markets: MarketTable,
    #[serde(default)]
    pub scope: MarketScope,
    pub capex: CapexPlan,
}

fn default_name() -> String {
    "base".to_string()
}

impl ScenarioConfig {
    /// Copy of this scenario with one parameter replaced.
    pub fn with_parameter(&self, key: &str, value: Decimal) -> Self {
        Self {
            parameters: self.parameters.with_override(key, value),
            ..self.clone()
        }
    }
}

impl ParameterSource for ScenarioConfig {
    fn parameter_set(&self) -> &ParameterSet {
        &self.parameters
    }

    fn horizon(&self) -> ProjectionHorizon {
        self.horizon
    }

    fn capex_plan(&self) -> &CapexPlan {
        &self.capex
    }

    fn active_markets(&self) -> BizPlanResult<ScopedMarkets> {
        if self.markets.is_empty() {
            return Err(BizPlanError::MissingCollaborator(format!(
                "scenario '{}' has no market distribution table",
                self.name
            )));
        }
        self.markets.restrict(&self.scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SCENARIO_JSON: &str = r#"{
        "name": "two-market",
        "horizon": { "start_year": 2025, "pre_operating_years": 1, "operating_years": 4 },
        "parameters": { "debt_ratio": 0.5, "equity_ratio": 0.5 },
        "markets": [
            { "id": "us", "label": "United States", "weight": "0.6", "premium": "1.0" },
            { "id": "uk", "label": "United Kingdom", "weight": "0.2", "premium": "1.1" },
            { "id": "de", "label": "Germany", "weight": "0.2", "premium": "1.05" }
        ],
        "scope": { "only": ["us", "uk"] },
        "capex": {
            "line_items": [ { "name": "technology", "amount": "500000" } ],
            "base_distribution": ["0.5", "0.5"]
        }
    }"#;

    #[test]
    fn test_scenario_from_json() {
        let scenario: ScenarioConfig = serde_json::from_str(SCENARIO_JSON).unwrap();
        assert_eq!(scenario.name, "two-market");
        assert_eq!(scenario.horizon().first_operating_year(), 2026);
        assert_eq!(scenario.financial_params().unwrap().debt_ratio, dec!(0.5));

        let active = scenario.active_markets().unwrap();
        assert_eq!(active.table.markets().len(), 2);
        assert_eq!(active.table.get("us").unwrap().weight, dec!(0.75));
    }

    #[test]
    fn test_with_parameter_overrides_copy() {
        let scenario: ScenarioConfig = serde_json::from_str(SCENARIO_JSON).unwrap();
        let changed = scenario.with_parameter("tax_rate", dec!(0.3));
        assert_eq!(changed.financial_params().unwrap().tax_rate, dec!(0.3));
        assert_ne!(scenario.financial_params().unwrap().tax_rate, dec!(0.3));
    }

    #[test]
    fn test_missing_markets_is_missing_collaborator() {
        let mut scenario: ScenarioConfig = serde_json::from_str(SCENARIO_JSON).unwrap();
        scenario.markets = MarketTable::default();
        let err = scenario.active_markets().unwrap_err();
        assert!(matches!(err, BizPlanError::MissingCollaborator(_)));
    }
}
