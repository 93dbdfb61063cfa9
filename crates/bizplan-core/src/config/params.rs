use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};
use crate::BizPlanResult;

/// Flat mapping of named scalars supplied by the configuration layer.
///
/// The engine only ever reads it; overrides produce a new set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: BTreeMap<String, Decimal>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.values.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn with(mut self, key: impl Into<String>, value: Decimal) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Copy of this set with `key` replaced.
    pub fn with_override(&self, key: &str, value: Decimal) -> Self {
        self.clone().with(key, value)
    }

    /// Financial view of the set; keys it does not name are ignored.
    pub fn financial(&self) -> BizPlanResult<FinancialParams> {
        Ok(serde_json::from_value(serde_json::to_value(&self.values)?)?)
    }

    /// Business view of the set; keys it does not name are ignored.
    pub fn business(&self) -> BizPlanResult<BusinessParams> {
        Ok(serde_json::from_value(serde_json::to_value(&self.values)?)?)
    }

    /// Whether either typed view reads `key`.
    pub fn is_known_key(key: &str) -> bool {
        FinancialParams::KEYS.contains(&key) || BusinessParams::KEYS.contains(&key)
    }

    /// Value in effect for `key`: the explicit entry, else the typed default.
    /// `None` for unset optional parameters and unknown keys.
    pub fn resolved(&self, key: &str) -> BizPlanResult<Option<Decimal>> {
        if let Some(v) = self.get(key) {
            return Ok(Some(v));
        }
        let views = [
            serde_json::to_value(self.financial()?)?,
            serde_json::to_value(self.business()?)?,
        ];
        Ok(views
            .iter()
            .find_map(|view| view.get(key))
            .and_then(|v| serde_json::from_value(v.clone()).ok()))
    }
}

impl FromIterator<(String, Decimal)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, Decimal)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Financing, cost and discounting assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialParams {
    /// Share of each year's CAPEX funded by debt
    pub debt_ratio: Rate,
    /// Share of each year's CAPEX funded by equity
    pub equity_ratio: Rate,
    /// Cost of goods sold as a fraction of net revenue
    pub cogs_pct: Rate,
    /// Operating expenses as a fraction of net revenue
    pub operating_expenses_pct: Rate,
    pub tax_rate: Rate,
    /// Straight-line useful life of the CAPEX base
    pub depreciation_years: Decimal,
    /// WACC override; built from CAPM when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<Rate>,
    /// Cost of equity override; CAPM when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_of_equity: Option<Rate>,
    pub risk_free_rate: Rate,
    pub equity_risk_premium: Rate,
    pub beta: Decimal,
    pub country_risk_premium: Rate,
    /// Pre-tax interest rate on project debt
    pub cost_of_debt: Rate,
    /// Years over which debt principal amortises in equal instalments
    pub debt_term_years: Decimal,
}

impl FinancialParams {
    pub const KEYS: &'static [&'static str] = &[
        "debt_ratio",
        "equity_ratio",
        "cogs_pct",
        "operating_expenses_pct",
        "tax_rate",
        "depreciation_years",
        "discount_rate",
        "cost_of_equity",
        "risk_free_rate",
        "equity_risk_premium",
        "beta",
        "country_risk_premium",
        "cost_of_debt",
        "debt_term_years",
    ];
}

impl Default for FinancialParams {
    fn default() -> Self {
        Self {
            debt_ratio: dec!(0.60),
            equity_ratio: dec!(0.40),
            cogs_pct: dec!(0.35),
            operating_expenses_pct: dec!(0.25),
            tax_rate: dec!(0.25),
            depreciation_years: dec!(5),
            discount_rate: None,
            cost_of_equity: None,
            risk_free_rate: dec!(0.04),
            equity_risk_premium: dec!(0.06),
            beta: dec!(1.2),
            country_risk_premium: dec!(0.02),
            cost_of_debt: dec!(0.08),
            debt_term_years: dec!(5),
        }
    }
}

/// Demand, pricing and overhead assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessParams {
    /// Monthly visits before the first year of growth
    pub initial_traffic: Decimal,
    pub traffic_growth: Rate,
    pub initial_conversion: Rate,
    pub conversion_growth_rate: Rate,
    pub conversion_cap: Rate,
    /// Base average order value
    pub avg_ticket: Money,
    /// Linear yearly uplift of the average ticket
    pub premium_growth: Rate,
    /// Payment processing fee as a fraction of gross revenue
    pub processing_fee_rate: Rate,
    /// Annual fixed sales payroll in the first operating year
    pub sales_salary: Money,
    pub marketing_pct: Rate,
    /// Yearly escalation applied to fixed payroll
    pub inflation: Rate,
    /// Months of trading in the first operating year, if partial
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_months: Option<Decimal>,
}

impl BusinessParams {
    pub const KEYS: &'static [&'static str] = &[
        "initial_traffic",
        "traffic_growth",
        "initial_conversion",
        "conversion_growth_rate",
        "conversion_cap",
        "avg_ticket",
        "premium_growth",
        "processing_fee_rate",
        "sales_salary",
        "marketing_pct",
        "inflation",
        "launch_months",
    ];
}

impl Default for BusinessParams {
    fn default() -> Self {
        Self {
            initial_traffic: dec!(10000),
            traffic_growth: dec!(0.50),
            initial_conversion: dec!(0.02),
            conversion_growth_rate: dec!(0.20),
            conversion_cap: dec!(0.08),
            avg_ticket: dec!(50),
            premium_growth: dec!(0.05),
            processing_fee_rate: dec!(0.03),
            sales_salary: Decimal::ZERO,
            marketing_pct: Decimal::ZERO,
            inflation: Decimal::ZERO,
            launch_months: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_set_yields_defaults() {
        let set = ParameterSet::new();
        assert_eq!(set.financial().unwrap(), FinancialParams::default());
        assert_eq!(set.business().unwrap(), BusinessParams::default());
    }

    #[test]
    fn test_flat_keys_feed_typed_views() {
        let set = ParameterSet::new()
            .with("debt_ratio", dec!(0.7))
            .with("equity_ratio", dec!(0.3))
            .with("initial_traffic", dec!(25000))
            .with("launch_months", dec!(6))
            .with("unrelated_key", dec!(1));

        let fin = set.financial().unwrap();
        assert_eq!(fin.debt_ratio, dec!(0.7));
        assert_eq!(fin.equity_ratio, dec!(0.3));
        assert_eq!(fin.tax_rate, FinancialParams::default().tax_rate);

        let biz = set.business().unwrap();
        assert_eq!(biz.initial_traffic, dec!(25000));
        assert_eq!(biz.launch_months, Some(dec!(6)));
    }

    #[test]
    fn test_override_leaves_original_untouched() {
        let base = ParameterSet::new().with("tax_rate", dec!(0.25));
        let changed = base.with_override("tax_rate", dec!(0.30));
        assert_eq!(base.get("tax_rate"), Some(dec!(0.25)));
        assert_eq!(changed.get("tax_rate"), Some(dec!(0.30)));
    }

    #[test]
    fn test_deserialize_from_json_numbers() {
        let set: ParameterSet =
            serde_json::from_str(r#"{"cogs_pct": 0.4, "discount_rate": "0.11"}"#).unwrap();
        let fin = set.financial().unwrap();
        assert_eq!(fin.cogs_pct, dec!(0.4));
        assert_eq!(fin.discount_rate, Some(dec!(0.11)));
    }

    #[test]
    fn test_resolved_falls_back_to_typed_default() {
        let set = ParameterSet::new().with("cogs_pct", dec!(0.4));
        assert_eq!(set.resolved("cogs_pct").unwrap(), Some(dec!(0.4)));
        assert_eq!(set.resolved("tax_rate").unwrap(), Some(dec!(0.25)));
        assert_eq!(set.resolved("avg_ticket").unwrap(), Some(dec!(50)));
        assert_eq!(set.resolved("discount_rate").unwrap(), None);
        assert_eq!(set.resolved("not_a_parameter").unwrap(), None);
    }

    #[test]
    fn test_known_keys() {
        assert!(ParameterSet::is_known_key("beta"));
        assert!(ParameterSet::is_known_key("launch_months"));
        assert!(!ParameterSet::is_known_key("wacc"));
    }
}
