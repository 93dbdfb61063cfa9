use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ParameterSource;
use crate::dashboard::defaults::default_snapshot;
use crate::dashboard::metrics::ValuationSnapshot;
use crate::dashboard::pipeline::{compute_plan, PlanModel};
use crate::types::{Money, ProjectionHorizon, Rate, Year};
use crate::valuation::Payback;
use crate::BizPlanResult;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Values cached by a previously run "real" model. Every field present
/// replaces the recomputed figure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelState {
    pub npv: Option<Money>,
    pub irr: Option<Rate>,
    pub payback: Option<Payback>,
    pub roi_pct: Option<Decimal>,
    pub break_even_year: Option<Year>,
    pub financial_npv: Option<Money>,
    pub financial_irr: Option<Rate>,
}

impl ModelState {
    pub fn is_empty(&self) -> bool {
        *self == ModelState::default()
    }
}

pub trait ModelStateSource {
    /// Latest cached state, if any model has run.
    fn model_state(&self) -> Option<ModelState>;
}

/// Receives the user-visible notice raised when a recompute fails.
pub trait AdvisoryNotifier {
    fn notify(&self, message: &str);
}

/// Everything the dashboard talks to, declared up front.
pub struct Collaborators {
    pub parameters: Box<dyn ParameterSource>,
    pub model_state: Option<Box<dyn ModelStateSource>>,
    pub advisory: Option<Box<dyn AdvisoryNotifier>>,
}

impl Collaborators {
    pub fn new(parameters: Box<dyn ParameterSource>) -> Self {
        Self {
            parameters,
            model_state: None,
            advisory: None,
        }
    }

    pub fn with_model_state(mut self, source: Box<dyn ModelStateSource>) -> Self {
        self.model_state = Some(source);
        self
    }

    pub fn with_advisory(mut self, notifier: Box<dyn AdvisoryNotifier>) -> Self {
        self.advisory = Some(notifier);
        self
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Fresh pipeline output
    Recomputed,
    /// Pipeline output with cached model values laid over it
    Reconciled,
    /// Static fallback data
    Defaults,
}

/// One horizon year as the dashboard shows it. Pre-operating years carry
/// the CAPEX outlay as their cash flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: Year,
    pub capex: Money,
    pub debt: Money,
    pub equity: Money,
    pub revenue: Money,
    pub ebitda: Money,
    pub fcf: Money,
    pub cumulative_fcf: Money,
    pub equity_flow: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub source: SnapshotSource,
    pub computed_at: DateTime<Utc>,
    pub horizon: ProjectionHorizon,
    pub total_capex: Money,
    pub total_debt: Money,
    pub total_equity: Money,
    pub revenue_cagr: Rate,
    pub years: Vec<YearSummary>,
    pub valuation: ValuationSnapshot,
    pub warnings: Vec<String>,
}

impl DashboardSnapshot {
    pub fn from_model(model: &PlanModel, warnings: Vec<String>) -> Self {
        let horizon = model.horizon;
        let mut cumulative = Decimal::ZERO;
        let years = horizon
            .years()
            .map(|year| {
                let capex = model.capex.total_for(year);
                let (debt, equity) = model
                    .capex
                    .financing_for(year)
                    .map(|f| (f.debt, f.equity))
                    .unwrap_or_default();
                let economic = model.cash_flows.economic.years.iter().find(|y| y.year == year);
                let financial = model.cash_flows.financial.years.iter().find(|y| y.year == year);

                let (revenue, ebitda, fcf) = economic
                    .map(|y| (y.revenue, y.ebitda, y.fcf))
                    .unwrap_or((Decimal::ZERO, Decimal::ZERO, -capex));
                let equity_flow = financial.map(|y| y.equity_flow).unwrap_or(-equity);
                cumulative += fcf;

                YearSummary {
                    year,
                    capex,
                    debt,
                    equity,
                    revenue,
                    ebitda,
                    fcf,
                    cumulative_fcf: cumulative,
                    equity_flow,
                }
            })
            .collect();

        Self {
            source: SnapshotSource::Recomputed,
            computed_at: Utc::now(),
            horizon,
            total_capex: model.capex.total_capex,
            total_debt: model.capex.total_debt,
            total_equity: model.capex.total_equity,
            revenue_cagr: model.revenue.net_revenue_cagr,
            years,
            valuation: model.metrics.clone(),
            warnings,
        }
    }

    /// Lay cached model values over the recomputed ones.
    pub fn reconcile(mut self, state: &ModelState) -> Self {
        if state.is_empty() {
            return self;
        }
        let v = &mut self.valuation;
        if let Some(npv) = state.npv {
            v.npv = npv;
        }
        if let Some(irr) = state.irr {
            v.irr = irr;
        }
        if let Some(payback) = state.payback {
            v.payback = payback;
        }
        if let Some(roi) = state.roi_pct {
            v.roi_pct = roi;
        }
        if let Some(year) = state.break_even_year {
            v.break_even_year = Some(year);
        }
        if let Some(npv) = state.financial_npv {
            v.financial_npv = npv;
        }
        if let Some(irr) = state.financial_irr {
            v.financial_irr = irr;
        }
        self.source = SnapshotSource::Reconciled;
        self
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

pub const ADVISORY_MESSAGE: &str =
    "The financial model could not be recalculated; showing default figures.";

/// Holds the last published snapshot and recomputes it on request.
pub struct Dashboard {
    collaborators: Collaborators,
    snapshot: DashboardSnapshot,
}

impl Dashboard {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            snapshot: default_snapshot(),
        }
    }

    /// Last published snapshot; the defaults until the first recompute.
    pub fn snapshot(&self) -> &DashboardSnapshot {
        &self.snapshot
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Swap the parameter source, e.g. after the user edits an input.
    pub fn set_parameters(&mut self, parameters: Box<dyn ParameterSource>) {
        self.collaborators.parameters = parameters;
    }

    /// Rerun the pipeline and publish the result. On failure the whole
    /// default snapshot is published and the advisory notifier is told once.
    pub fn recompute(&mut self) -> &DashboardSnapshot {
        self.snapshot = match self.build_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "dashboard recompute failed, publishing defaults");
                if let Some(advisory) = &self.collaborators.advisory {
                    advisory.notify(ADVISORY_MESSAGE);
                }
                let mut snapshot = default_snapshot();
                snapshot.warnings.push(e.to_string());
                snapshot
            }
        };
        &self.snapshot
    }

    /// The snapshot a recompute would publish, without the fallback.
    pub fn build_snapshot(&self) -> BizPlanResult<DashboardSnapshot> {
        let plan = compute_plan(self.collaborators.parameters.as_ref())?;
        let snapshot = DashboardSnapshot::from_model(&plan.result, plan.warnings);

        let state = self
            .collaborators
            .model_state
            .as_ref()
            .and_then(|source| source.model_state());

        Ok(match state {
            Some(state) => snapshot.reconcile(&state),
            None => snapshot,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketTable;
    use crate::dashboard::defaults::default_scenario;
    use rust_decimal_macros::dec;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingNotifier(Rc<Cell<u32>>);

    impl AdvisoryNotifier for CountingNotifier {
        fn notify(&self, _message: &str) {
            self.0.set(self.0.get() + 1);
        }
    }

    struct FixedState(ModelState);

    impl ModelStateSource for FixedState {
        fn model_state(&self) -> Option<ModelState> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn test_snapshot_before_recompute_is_defaults() {
        let dashboard = Dashboard::new(Collaborators::new(Box::new(default_scenario())));
        assert_eq!(dashboard.snapshot().source, SnapshotSource::Defaults);
    }

    #[test]
    fn test_recompute_publishes_pipeline_output() {
        let mut dashboard = Dashboard::new(Collaborators::new(Box::new(default_scenario())));
        let snap = dashboard.recompute();
        assert_eq!(snap.source, SnapshotSource::Recomputed);
        assert_eq!(snap.years.len(), 5);
        assert_eq!(snap.years[0].fcf, dec!(-360000));
        assert_eq!(snap.total_capex, dec!(800000));
    }

    #[test]
    fn test_failure_publishes_defaults_and_notifies_once() {
        let calls = Rc::new(Cell::new(0));
        let mut broken = default_scenario();
        broken.markets = MarketTable::new(vec![]);
        let collaborators = Collaborators::new(Box::new(broken))
            .with_advisory(Box::new(CountingNotifier(calls.clone())));
        let mut dashboard = Dashboard::new(collaborators);

        let snap = dashboard.recompute();
        assert_eq!(snap.source, SnapshotSource::Defaults);
        assert_eq!(snap.valuation, default_snapshot().valuation);
        assert_eq!(snap.warnings.len(), 1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_model_state_overrides_recomputed_values() {
        let state = ModelState {
            npv: Some(dec!(123456)),
            payback: Some(Payback::Undetermined),
            ..ModelState::default()
        };
        let collaborators = Collaborators::new(Box::new(default_scenario()))
            .with_model_state(Box::new(FixedState(state)));
        let mut dashboard = Dashboard::new(collaborators);

        let snap = dashboard.recompute().clone();
        assert_eq!(snap.source, SnapshotSource::Reconciled);
        assert_eq!(snap.valuation.npv, dec!(123456));
        assert_eq!(snap.valuation.payback, Payback::Undetermined);

        let fresh = dashboard.build_snapshot().unwrap();
        assert_eq!(snap.valuation.irr, fresh.valuation.irr);
    }

    #[test]
    fn test_empty_model_state_keeps_recomputed_source() {
        let collaborators = Collaborators::new(Box::new(default_scenario()))
            .with_model_state(Box::new(FixedState(ModelState::default())));
        let mut dashboard = Dashboard::new(collaborators);
        assert_eq!(dashboard.recompute().source, SnapshotSource::Recomputed);
    }
}
