use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::BizPlanError;
use crate::types::{Money, Rate};
use crate::BizPlanResult;

const IRR_TOLERANCE: Decimal = dec!(0.0001);
const MAX_IRR_ITERATIONS: u32 = 100;
const IRR_INITIAL_GUESS: Rate = dec!(0.10);
const IRR_LOWER_BOUND: Rate = dec!(-0.99);
const IRR_UPPER_BOUND: Rate = dec!(10);

/// How an IRR figure was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum IrrMethod {
    NewtonRaphson { iterations: u32 },
    /// (positive flows / outlay)^(1/n) - 1, floored at zero
    AnalyticFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrrEstimate {
    pub rate: Rate,
    #[serde(flatten)]
    pub method: IrrMethod,
}

/// Net Present Value of a series of cash flows, the first at t = 0.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> BizPlanResult<Money> {
    if rate <= dec!(-1) {
        return Err(BizPlanError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| BizPlanError::Overflow {
                    context: format!("NPV discount factor at period {t}"),
                })?;
        }
        if discount.is_zero() {
            return Err(BizPlanError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf.checked_div(discount).ok_or_else(|| BizPlanError::Overflow {
            context: format!("NPV discounted flow at period {t}"),
        })?;
    }

    Ok(result)
}

/// Internal Rate of Return.
///
/// Newton-Raphson from a 10% guess; when that does not converge the
/// analytic approximation is used instead, so a rate is always produced.
pub fn irr(cash_flows: &[Money]) -> IrrEstimate {
    match newton_irr(cash_flows, IRR_INITIAL_GUESS) {
        Ok((rate, iterations)) => IrrEstimate {
            rate,
            method: IrrMethod::NewtonRaphson { iterations },
        },
        Err(e) => {
            tracing::warn!(error = %e, "IRR root-finder failed, using analytic approximation");
            IrrEstimate {
                rate: analytic_irr(cash_flows),
                method: IrrMethod::AnalyticFallback,
            }
        }
    }
}

/// Newton-Raphson root of `f(r) = Σ cf_t / (1+r)^t`.
///
/// Returns the rate and the iteration on which `|f(r)| < 1e-4` held.
/// Gives up when the derivative is zero, the next rate leaves (-0.99, 10),
/// or 100 iterations pass.
pub fn newton_irr(cash_flows: &[Money], guess: Rate) -> BizPlanResult<(Rate, u32)> {
    if cash_flows.len() < 2 {
        return Err(BizPlanError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let mut rate = guess;

    for i in 0..MAX_IRR_ITERATIONS {
        let (npv_val, dnpv) = npv_with_derivative(cash_flows, rate)?;

        if npv_val.abs() < IRR_TOLERANCE {
            return Ok((rate, i));
        }

        if dnpv.is_zero() {
            return Err(BizPlanError::ConvergenceFailure {
                function: "IRR".into(),
                iterations: i,
                last_delta: npv_val,
            });
        }

        let step = npv_val
            .checked_div(dnpv)
            .ok_or_else(|| BizPlanError::Overflow {
                context: "IRR Newton step".into(),
            })?;
        let next = rate - step;

        if next <= IRR_LOWER_BOUND || next >= IRR_UPPER_BOUND {
            return Err(BizPlanError::ConvergenceFailure {
                function: "IRR".into(),
                iterations: i + 1,
                last_delta: npv_val,
            });
        }
        rate = next;
    }

    Err(BizPlanError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS,
        last_delta: npv(rate, cash_flows).unwrap_or(Decimal::MAX),
    })
}

/// `(Σ positive flows / |cf_0|)^(1/n) - 1`, or zero when the positive flows
/// do not exceed the initial outlay.
pub fn analytic_irr(cash_flows: &[Money]) -> Rate {
    let Some((first, rest)) = cash_flows.split_first() else {
        return Decimal::ZERO;
    };
    let outlay = first.abs();
    let positive: Money = rest.iter().filter(|cf| **cf > Decimal::ZERO).copied().sum();

    if rest.is_empty() || outlay.is_zero() || positive <= outlay {
        return Decimal::ZERO;
    }

    let exponent = Decimal::ONE / Decimal::from(rest.len() as u64);
    (positive / outlay)
        .checked_powd(exponent)
        .map(|growth| growth - Decimal::ONE)
        .unwrap_or(Decimal::ZERO)
}

fn npv_with_derivative(cash_flows: &[Money], rate: Rate) -> BizPlanResult<(Money, Decimal)> {
    let overflow = |context: &str| BizPlanError::Overflow {
        context: context.to_string(),
    };

    let one_plus_r = Decimal::ONE + rate;
    let mut npv_val = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| overflow("IRR discount factor"))?;
        }
        if discount.is_zero() {
            return Err(BizPlanError::DivisionByZero {
                context: format!("IRR discount factor at period {t}"),
            });
        }
        npv_val += cf
            .checked_div(discount)
            .ok_or_else(|| overflow("IRR discounted flow"))?;
        if t > 0 {
            let t_dec = Decimal::from(t as i64);
            let next_discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| overflow("IRR derivative discount"))?;
            dnpv -= (t_dec * cf)
                .checked_div(next_discount)
                .ok_or_else(|| overflow("IRR derivative term"))?;
        }
    }

    Ok((npv_val, dnpv))
}

/// `(1 + rate)^periods` by repeated multiplication.
pub fn growth_factor(rate: Rate, periods: u32) -> BizPlanResult<Decimal> {
    let base = Decimal::ONE + rate;
    let mut factor = Decimal::ONE;
    for _ in 0..periods {
        factor = factor
            .checked_mul(base)
            .ok_or_else(|| BizPlanError::Overflow {
                context: format!("growth factor (1 + {rate})^{periods}"),
            })?;
    }
    Ok(factor)
}

/// `a × b`, or `Overflow` naming `context` when it leaves the Decimal range.
pub fn checked_product(a: Decimal, b: Decimal, context: &str) -> BizPlanResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| BizPlanError::Overflow {
        context: context.to_string(),
    })
}

/// Sum of `values`, or `Overflow` naming `context`.
pub fn checked_total<I>(values: I, context: &str) -> BizPlanResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| BizPlanError::Overflow {
            context: context.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_checked_helpers_report_overflow() {
        assert_eq!(checked_product(dec!(2), dec!(3), "x").unwrap(), dec!(6));
        assert!(matches!(
            checked_product(Decimal::MAX, dec!(2), "orders"),
            Err(BizPlanError::Overflow { context }) if context == "orders"
        ));
        assert_eq!(checked_total(vec![dec!(1), dec!(2)], "x").unwrap(), dec!(3));
        assert!(checked_total(vec![Decimal::MAX, Decimal::MAX], "total").is_err());
    }

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_at_minus_one() {
        let cfs = vec![dec!(-100), dec!(50)];
        assert!(npv(dec!(-1), &cfs).is_err());
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs);
        // IRR should be ~9.7%
        assert!((result.rate - dec!(0.097)).abs() < dec!(0.01));
        assert!(matches!(result.method, IrrMethod::NewtonRaphson { .. }));
    }

    #[test]
    fn test_irr_round_trip_npv_near_zero() {
        let cfs = vec![dec!(-900000), dec!(200000), dec!(300000), dec!(400000), dec!(400000)];
        let result = irr(&cfs);
        assert!(matches!(result.method, IrrMethod::NewtonRaphson { .. }));
        let residual = npv(result.rate, &cfs).unwrap();
        assert!(residual.abs() < dec!(0.0001), "residual {residual}");
    }

    #[test]
    fn test_irr_all_negative_falls_back_to_zero() {
        let cfs = vec![dec!(-1000), dec!(-100), dec!(-100)];
        let result = irr(&cfs);
        assert_eq!(result.method, IrrMethod::AnalyticFallback);
        assert_eq!(result.rate, Decimal::ZERO);
    }

    #[test]
    fn test_newton_zero_derivative_aborts() {
        // Every flow after t=0 is zero: f'(r) == 0 everywhere
        let cfs = vec![dec!(-1000), dec!(0), dec!(0)];
        let err = newton_irr(&cfs, dec!(0.10)).unwrap_err();
        assert!(matches!(err, BizPlanError::ConvergenceFailure { .. }));
    }

    #[test]
    fn test_newton_needs_two_flows() {
        assert!(newton_irr(&[dec!(-100)], dec!(0.10)).is_err());
    }

    #[test]
    fn test_analytic_irr() {
        // 2000 back on 1000 over 2 years → sqrt(2) - 1 ≈ 0.4142
        let cfs = vec![dec!(-1000), dec!(1000), dec!(1000)];
        let r = analytic_irr(&cfs);
        assert!((r - dec!(0.4142)).abs() < dec!(0.001), "got {r}");
    }

    #[test]
    fn test_analytic_irr_not_recovered_is_zero() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(500)];
        assert_eq!(analytic_irr(&cfs), Decimal::ZERO);
    }

    #[test]
    fn test_growth_factor() {
        assert_eq!(growth_factor(dec!(0.5), 0).unwrap(), Decimal::ONE);
        assert_eq!(growth_factor(dec!(0.5), 2).unwrap(), dec!(2.25));
    }
}
