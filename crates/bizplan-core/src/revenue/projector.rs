use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::{BusinessParams, MarketTable};
use crate::error::BizPlanError;
use crate::time_value::{checked_product, checked_total, growth_factor};
use crate::types::{with_metadata, ComputationOutput, Money, ProjectionHorizon, Rate, Year};
use crate::BizPlanResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input parameters for the revenue projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueInput {
    pub horizon: ProjectionHorizon,
    pub business: BusinessParams,
    /// Active markets; weights are expected to sum to 1
    pub markets: MarketTable,
}

/// Revenue for one market in one operating year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRevenue {
    pub year: Year,
    pub market_id: String,
    pub label: String,
    /// Annual visits attributed to the market
    pub traffic: Decimal,
    pub conversion_rate: Rate,
    /// Local price: base ticket times the market premium
    pub average_ticket: Money,
    pub orders: Decimal,
    pub gross_revenue: Money,
    pub net_revenue: Money,
}

/// One operating year, all active markets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRevenue {
    pub year: Year,
    /// Offset from the first operating year
    pub year_offset: u32,
    /// Monthly traffic before the market split
    pub monthly_traffic: Decimal,
    /// Months of trading counted in this year
    pub months: Decimal,
    pub conversion_rate: Rate,
    pub base_ticket: Money,
    pub markets: Vec<MarketRevenue>,
    pub traffic: Decimal,
    pub orders: Decimal,
    pub gross_revenue: Money,
    pub net_revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueProjection {
    pub years: Vec<YearRevenue>,
    /// CAGR of net revenue between the first and last operating year
    pub net_revenue_cagr: Rate,
}

impl RevenueProjection {
    pub fn year(&self, year: Year) -> Option<&YearRevenue> {
        self.years.iter().find(|y| y.year == year)
    }

    /// Net revenue across markets for `year`; zero outside the projection.
    pub fn total_for(&self, year: Year) -> Money {
        self.year(year).map(|y| y.net_revenue).unwrap_or(Decimal::ZERO)
    }

    pub fn market(&self, year: Year, market_id: &str) -> Option<&MarketRevenue> {
        self.year(year)
            .and_then(|y| y.markets.iter().find(|m| m.market_id == market_id))
    }

    /// Net revenue CAGR between two projected years; zero when undefined.
    pub fn cagr(&self, start_year: Year, end_year: Year) -> Rate {
        if end_year <= start_year {
            return Decimal::ZERO;
        }
        cagr(
            self.total_for(start_year),
            self.total_for(end_year),
            (end_year - start_year) as u32,
        )
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project traffic, conversion, ticket and revenue for every operating year
/// and active market.
pub fn project_revenue(
    input: &RevenueInput,
) -> BizPlanResult<ComputationOutput<RevenueProjection>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_revenue_input(input, &mut warnings)?;

    let biz = &input.business;
    let fee_factor = Decimal::ONE - biz.processing_fee_rate;
    let mut years = Vec::with_capacity(input.horizon.operating_years as usize);

    for (t, year) in input.horizon.operating_years().enumerate() {
        let t = t as u32;
        let monthly_traffic = traffic_at(biz, t)?;
        let conversion_rate = conversion_at(biz, t)?;
        let base_ticket = ticket_at(biz, t)?;
        let months = months_in_year(biz, t);

        let markets = input
            .markets
            .markets()
            .iter()
            .map(|m| -> BizPlanResult<MarketRevenue> {
                let context = |what: &str| format!("{what} for market '{}' in {year}", m.id);
                let traffic = checked_product(
                    checked_product(monthly_traffic, m.weight, &context("traffic"))?,
                    months,
                    &context("traffic"),
                )?;
                let orders = checked_product(traffic, conversion_rate, &context("orders"))?;
                let average_ticket = checked_product(base_ticket, m.premium, &context("ticket"))?;
                let gross_revenue =
                    checked_product(orders, average_ticket, &context("gross revenue"))?;
                let net_revenue =
                    checked_product(gross_revenue, fee_factor, &context("net revenue"))?;
                Ok(MarketRevenue {
                    year,
                    market_id: m.id.clone(),
                    label: m.label.clone(),
                    traffic,
                    conversion_rate,
                    average_ticket,
                    orders,
                    gross_revenue,
                    net_revenue,
                })
            })
            .collect::<BizPlanResult<Vec<_>>>()?;

        let total = |field: fn(&MarketRevenue) -> Decimal, what: &str| {
            checked_total(markets.iter().map(field), &format!("{what} in {year}"))
        };

        years.push(YearRevenue {
            year,
            year_offset: t,
            monthly_traffic,
            months,
            conversion_rate,
            base_ticket,
            traffic: total(|m| m.traffic, "total traffic")?,
            orders: total(|m| m.orders, "total orders")?,
            gross_revenue: total(|m| m.gross_revenue, "total gross revenue")?,
            net_revenue: total(|m| m.net_revenue, "total net revenue")?,
            markets,
        });
    }

    let net_revenue_cagr = match (years.first(), years.last()) {
        (Some(first), Some(last)) if last.year > first.year => cagr(
            first.net_revenue,
            last.net_revenue,
            (last.year - first.year) as u32,
        ),
        _ => Decimal::ZERO,
    };

    tracing::debug!(
        years = years.len(),
        markets = input.markets.markets().len(),
        %net_revenue_cagr,
        "revenue projected"
    );

    let output = RevenueProjection {
        years,
        net_revenue_cagr,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Compounding traffic x capped conversion x linear ticket, per market",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Monthly traffic in operating year `t`: base × (1 + g)^(t+1).
pub fn traffic_at(biz: &BusinessParams, t: u32) -> BizPlanResult<Decimal> {
    checked_product(
        biz.initial_traffic,
        growth_factor(biz.traffic_growth, t + 1)?,
        &format!("monthly traffic in operating year {t}"),
    )
}

/// Conversion in operating year `t`, compounding from the initial rate and
/// never above the cap.
pub fn conversion_at(biz: &BusinessParams, t: u32) -> BizPlanResult<Rate> {
    let grown = checked_product(
        biz.initial_conversion,
        growth_factor(biz.conversion_growth_rate, t)?,
        &format!("conversion in operating year {t}"),
    )?;
    Ok(grown.min(biz.conversion_cap))
}

/// Base ticket in operating year `t`, growing linearly.
pub fn ticket_at(biz: &BusinessParams, t: u32) -> BizPlanResult<Money> {
    let context = format!("ticket in operating year {t}");
    let uplift = checked_product(biz.premium_growth, Decimal::from(t), &context)?;
    let factor = Decimal::ONE
        .checked_add(uplift)
        .ok_or_else(|| BizPlanError::Overflow {
            context: context.clone(),
        })?;
    checked_product(biz.avg_ticket, factor, &context)
}

/// `(end / start)^(1 / years) - 1`; zero when `start <= 0` or `years == 0`.
pub fn cagr(start_value: Money, end_value: Money, years: u32) -> Rate {
    if start_value <= Decimal::ZERO || years == 0 {
        return Decimal::ZERO;
    }
    if end_value <= Decimal::ZERO {
        return if end_value.is_zero() {
            Decimal::NEGATIVE_ONE
        } else {
            Decimal::ZERO
        };
    }
    let exponent = Decimal::ONE / Decimal::from(years);
    end_value
        .checked_div(start_value)
        .and_then(|ratio| ratio.checked_powd(exponent))
        .map(|ratio| ratio - Decimal::ONE)
        .unwrap_or(Decimal::ZERO)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn months_in_year(biz: &BusinessParams, t: u32) -> Decimal {
    match biz.launch_months {
        Some(months) if t == 0 => months.clamp(Decimal::ZERO, MONTHS_PER_YEAR),
        _ => MONTHS_PER_YEAR,
    }
}

fn validate_revenue_input(input: &RevenueInput, warnings: &mut Vec<String>) -> BizPlanResult<()> {
    input.horizon.validate()?;

    if input.markets.is_empty() {
        return Err(BizPlanError::InsufficientData(
            "Revenue projection requires at least one market".into(),
        ));
    }

    let biz = &input.business;
    if biz.traffic_growth <= dec!(-1) || biz.conversion_growth_rate <= dec!(-1) {
        return Err(BizPlanError::InvalidInput {
            field: "traffic_growth / conversion_growth_rate".into(),
            reason: "Growth rates must be greater than -100%".into(),
        });
    }

    let weight_sum = input.markets.total_weight();
    if (weight_sum - Decimal::ONE).abs() > dec!(0.0001) {
        warnings.push(format!(
            "Market weights sum to {weight_sum}; revenue scales with the weight total"
        ));
    }
    if biz.initial_conversion > biz.conversion_cap {
        warnings.push(format!(
            "Initial conversion {} exceeds the cap {}; capped from the first year",
            biz.initial_conversion, biz.conversion_cap
        ));
    }
    if let Some(months) = biz.launch_months {
        if months <= Decimal::ZERO || months > MONTHS_PER_YEAR {
            warnings.push(format!(
                "launch_months {months} outside 1..=12; clamped"
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Market;
    use rust_decimal_macros::dec;

    fn single_market_input() -> RevenueInput {
        RevenueInput {
            horizon: ProjectionHorizon::new(2025, 1, 4),
            business: BusinessParams {
                initial_traffic: dec!(10000),
                traffic_growth: dec!(0.50),
                initial_conversion: dec!(0.02),
                conversion_growth_rate: dec!(0.20),
                conversion_cap: dec!(0.08),
                avg_ticket: dec!(50),
                premium_growth: dec!(0.05),
                processing_fee_rate: dec!(0.03),
                ..BusinessParams::default()
            },
            markets: MarketTable::new(vec![Market::new("us", "United States", dec!(1.0), dec!(1.0))]),
        }
    }

    #[test]
    fn test_traffic_overflow_is_an_error() {
        let mut input = single_market_input();
        input.business.initial_traffic = Decimal::MAX;
        assert!(matches!(
            project_revenue(&input),
            Err(BizPlanError::Overflow { .. })
        ));
    }

    #[test]
    fn test_first_year_conversion_has_no_growth() {
        let out = project_revenue(&single_market_input()).unwrap().result;
        assert_eq!(out.years[0].conversion_rate, dec!(0.02));
        assert_eq!(out.years[1].conversion_rate, dec!(0.024));
    }

    #[test]
    fn test_first_year_figures() {
        let out = project_revenue(&single_market_input()).unwrap().result;
        let y1 = &out.years[0];
        // 10,000 * 1.5 = 15,000 monthly → 180,000 a year
        assert_eq!(y1.monthly_traffic, dec!(15000));
        assert_eq!(y1.traffic, dec!(180000));
        // 180,000 * 2% = 3,600 orders at $50
        assert_eq!(y1.orders, dec!(3600));
        assert_eq!(y1.gross_revenue, dec!(180000));
        assert_eq!(y1.net_revenue, dec!(174600));
        assert_eq!(out.total_for(2026), dec!(174600));
    }

    #[test]
    fn test_ticket_grows_linearly() {
        let biz = single_market_input().business;
        assert_eq!(ticket_at(&biz, 0).unwrap(), dec!(50));
        assert_eq!(ticket_at(&biz, 1).unwrap(), dec!(52.5));
        assert_eq!(ticket_at(&biz, 2).unwrap(), dec!(55));
    }

    #[test]
    fn test_conversion_capped() {
        let biz = single_market_input().business;
        for t in 0..15 {
            assert!(conversion_at(&biz, t).unwrap() <= dec!(0.08));
        }
        assert_eq!(conversion_at(&biz, 14).unwrap(), dec!(0.08));
    }

    #[test]
    fn test_net_is_gross_after_fee() {
        let out = project_revenue(&single_market_input()).unwrap().result;
        for y in &out.years {
            for m in &y.markets {
                assert_eq!(m.net_revenue, m.gross_revenue * dec!(0.97));
                assert_eq!(m.orders, m.traffic * m.conversion_rate);
            }
        }
    }

    #[test]
    fn test_market_premium_applies_to_ticket() {
        let mut input = single_market_input();
        input.markets = MarketTable::new(vec![
            Market::new("us", "United States", dec!(0.5), dec!(1.0)),
            Market::new("ch", "Switzerland", dec!(0.5), dec!(1.4)),
        ]);
        let out = project_revenue(&input).unwrap().result;
        let ch = out.market(2026, "ch").unwrap();
        assert_eq!(ch.average_ticket, dec!(70));
        let us = out.market(2026, "us").unwrap();
        assert!(ch.gross_revenue > us.gross_revenue);
    }

    #[test]
    fn test_partial_launch_year() {
        let mut input = single_market_input();
        input.business.launch_months = Some(dec!(6));
        let out = project_revenue(&input).unwrap().result;
        assert_eq!(out.years[0].months, dec!(6));
        assert_eq!(out.years[0].traffic, dec!(90000));
        assert_eq!(out.years[1].months, dec!(12));
    }

    #[test]
    fn test_cagr() {
        // 100 → 121 over 2 years = 10%
        let r = cagr(dec!(100), dec!(121), 2);
        assert!((r - dec!(0.10)).abs() < dec!(0.000001), "got {r}");
        assert_eq!(cagr(Decimal::ZERO, dec!(121), 2), Decimal::ZERO);
        assert_eq!(cagr(dec!(100), dec!(121), 0), Decimal::ZERO);
    }

    #[test]
    fn test_projection_cagr_positive() {
        let out = project_revenue(&single_market_input()).unwrap().result;
        assert!(out.net_revenue_cagr > Decimal::ZERO);
        assert_eq!(out.cagr(2026, 2026), Decimal::ZERO);
    }

    #[test]
    fn test_no_markets_rejected() {
        let mut input = single_market_input();
        input.markets = MarketTable::default();
        assert!(project_revenue(&input).is_err());
    }
}
