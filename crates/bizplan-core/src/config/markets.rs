use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BizPlanError;
use crate::types::Rate;
use crate::BizPlanResult;

/// A sales market and its share of total traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub label: String,
    /// Share of total traffic (fraction)
    pub weight: Rate,
    /// Local price multiplier on the base ticket
    pub premium: Decimal,
}

impl Market {
    pub fn new(id: &str, label: &str, weight: Rate, premium: Decimal) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            weight,
            premium,
        }
    }
}

/// Which markets take part in a scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketScope {
    #[default]
    All,
    Only(Vec<String>),
}

/// Ordered market distribution table for one scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketTable {
    markets: Vec<Market>,
}

/// Result of narrowing a table to an active scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedMarkets {
    pub table: MarketTable,
    pub warnings: Vec<String>,
}

impl MarketTable {
    pub fn new(markets: Vec<Market>) -> Self {
        Self { markets }
    }

    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Market> {
        self.markets.iter().find(|m| m.id == id)
    }

    pub fn total_weight(&self) -> Rate {
        self.markets.iter().map(|m| m.weight).sum()
    }

    /// Keep only the markets in `scope`, rescaling weights to sum to 1.
    ///
    /// A subset whose weights sum to zero is given equal weights.
    pub fn restrict(&self, scope: &MarketScope) -> BizPlanResult<ScopedMarkets> {
        let selected: Vec<Market> = match scope {
            MarketScope::All => self.markets.clone(),
            MarketScope::Only(ids) => {
                let mut picked = Vec::with_capacity(ids.len());
                for id in ids {
                    let market = self.get(id).ok_or_else(|| BizPlanError::InvalidInput {
                        field: "market_scope".into(),
                        reason: format!("Unknown market '{id}'"),
                    })?;
                    if !picked.iter().any(|m: &Market| m.id == market.id) {
                        picked.push(market.clone());
                    }
                }
                picked
            }
        };

        if selected.is_empty() {
            return Err(BizPlanError::InsufficientData(
                "No active markets in scope".into(),
            ));
        }

        let mut warnings = Vec::new();
        let total: Rate = selected.iter().map(|m| m.weight).sum();
        let markets = if total > Decimal::ZERO {
            selected
                .into_iter()
                .map(|m| Market {
                    weight: m.weight / total,
                    ..m
                })
                .collect()
        } else {
            warnings.push(
                "Active market weights sum to zero; distributing traffic equally".to_string(),
            );
            let equal = Decimal::ONE / Decimal::from(selected.len() as u64);
            selected
                .into_iter()
                .map(|m| Market { weight: equal, ..m })
                .collect()
        };

        Ok(ScopedMarkets {
            table: MarketTable { markets },
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn four_markets() -> MarketTable {
        MarketTable::new(vec![
            Market::new("us", "United States", dec!(0.40), dec!(1.00)),
            Market::new("uk", "United Kingdom", dec!(0.25), dec!(1.10)),
            Market::new("de", "Germany", dec!(0.20), dec!(1.05)),
            Market::new("jp", "Japan", dec!(0.15), dec!(1.25)),
        ])
    }

    #[test]
    fn test_all_scope_keeps_weights() {
        let scoped = four_markets().restrict(&MarketScope::All).unwrap();
        assert_eq!(scoped.table.markets().len(), 4);
        assert_eq!(scoped.table.total_weight(), dec!(1.00));
        assert!(scoped.warnings.is_empty());
    }

    #[test]
    fn test_subset_renormalises() {
        let scope = MarketScope::Only(vec!["us".into(), "uk".into()]);
        let scoped = four_markets().restrict(&scope).unwrap();
        let table = scoped.table;
        assert_eq!(table.markets().len(), 2);
        // 0.40 / 0.65 and 0.25 / 0.65
        let us = table.get("us").unwrap().weight;
        let uk = table.get("uk").unwrap().weight;
        assert!((us + uk - Decimal::ONE).abs() < dec!(0.0000000001));
        assert!(us > uk);
        assert_eq!(table.get("uk").unwrap().premium, dec!(1.10));
    }

    #[test]
    fn test_unknown_market_rejected() {
        let scope = MarketScope::Only(vec!["fr".into()]);
        assert!(four_markets().restrict(&scope).is_err());
    }

    #[test]
    fn test_zero_weight_subset_splits_equally() {
        let table = MarketTable::new(vec![
            Market::new("a", "A", dec!(0), dec!(1)),
            Market::new("b", "B", dec!(0), dec!(1)),
        ]);
        let scoped = table.restrict(&MarketScope::All).unwrap();
        assert_eq!(scoped.table.get("a").unwrap().weight, dec!(0.5));
        assert_eq!(scoped.warnings.len(), 1);
    }

    #[test]
    fn test_empty_table_is_insufficient() {
        assert!(MarketTable::default().restrict(&MarketScope::All).is_err());
    }
}
