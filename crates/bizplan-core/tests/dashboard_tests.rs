use std::cell::RefCell;
use std::rc::Rc;

use bizplan_core::config::{MarketScope, ParameterSet};
use bizplan_core::dashboard::{
    default_scenario, default_snapshot, AdvisoryNotifier, Collaborators, Dashboard, ModelState,
    ModelStateSource, SnapshotSource,
};
use bizplan_core::scenarios::{run_sensitivity, OutputMetric, SensitivityInput};
use bizplan_core::valuation::Payback;
use bizplan_core::{ProjectionHorizon, SensitivityVariable};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Clone, Default)]
struct RecordingNotifier(Rc<RefCell<Vec<String>>>);

impl AdvisoryNotifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.0.borrow_mut().push(message.to_string());
    }
}

struct CachedModel(ModelState);

impl ModelStateSource for CachedModel {
    fn model_state(&self) -> Option<ModelState> {
        Some(self.0.clone())
    }
}

struct NoModel;

impl ModelStateSource for NoModel {
    fn model_state(&self) -> Option<ModelState> {
        None
    }
}

#[test]
fn test_unknown_market_scope_falls_back_to_defaults() {
    let notices = RecordingNotifier::default();
    let mut scenario = default_scenario();
    scenario.scope = MarketScope::Only(vec!["atlantis".into()]);

    let mut dashboard = Dashboard::new(
        Collaborators::new(Box::new(scenario)).with_advisory(Box::new(notices.clone())),
    );
    let snap = dashboard.recompute();

    assert_eq!(snap.source, SnapshotSource::Defaults);
    assert_eq!(snap.years, default_snapshot().years);
    assert_eq!(notices.0.borrow().len(), 1);
}

#[test]
fn test_invalid_parameters_fall_back_without_partial_results() {
    let mut scenario = default_scenario();
    scenario.parameters = ParameterSet::new().with("tax_rate", dec!(1.5));

    let mut dashboard = Dashboard::new(Collaborators::new(Box::new(scenario)));
    let snap = dashboard.recompute();

    assert_eq!(snap.source, SnapshotSource::Defaults);
    assert_eq!(snap.valuation, default_snapshot().valuation);
}

#[test]
fn test_arithmetic_overflow_falls_back_to_defaults() {
    let notices = RecordingNotifier::default();
    let mut scenario = default_scenario().with_parameter("traffic_growth", dec!(8));
    scenario.horizon = ProjectionHorizon::new(2025, 1, 30);

    let mut dashboard = Dashboard::new(
        Collaborators::new(Box::new(scenario)).with_advisory(Box::new(notices.clone())),
    );
    let snap = dashboard.recompute();

    assert_eq!(snap.source, SnapshotSource::Defaults);
    assert_eq!(snap.valuation, default_snapshot().valuation);
    assert!(snap.warnings.iter().any(|w| w.contains("overflow")));
    assert_eq!(notices.0.borrow().len(), 1);
}

#[test]
fn test_recovery_after_parameters_are_fixed() {
    let mut broken = default_scenario();
    broken.parameters = ParameterSet::new().with("depreciation_years", dec!(-1));
    let mut dashboard = Dashboard::new(Collaborators::new(Box::new(broken)));
    assert_eq!(dashboard.recompute().source, SnapshotSource::Defaults);

    dashboard.set_parameters(Box::new(default_scenario()));
    assert_eq!(dashboard.recompute().source, SnapshotSource::Recomputed);
}

#[test]
fn test_absent_model_state_recomputes() {
    let collaborators =
        Collaborators::new(Box::new(default_scenario())).with_model_state(Box::new(NoModel));
    let mut dashboard = Dashboard::new(collaborators);
    assert_eq!(dashboard.recompute().source, SnapshotSource::Recomputed);
}

#[test]
fn test_cached_model_values_win() {
    let state = ModelState {
        irr: Some(dec!(0.25)),
        break_even_year: Some(2027),
        payback: Some(Payback::Determined { months: 20 }),
        ..ModelState::default()
    };
    let collaborators = Collaborators::new(Box::new(default_scenario()))
        .with_model_state(Box::new(CachedModel(state)));
    let mut dashboard = Dashboard::new(collaborators);
    let snap = dashboard.recompute();

    assert_eq!(snap.source, SnapshotSource::Reconciled);
    assert_eq!(snap.valuation.irr, dec!(0.25));
    assert_eq!(snap.valuation.break_even_year, Some(2027));
    assert_eq!(snap.valuation.payback, Payback::Determined { months: 20 });
}

#[test]
fn test_snapshot_years_accumulate_cash() {
    let mut dashboard = Dashboard::new(Collaborators::new(Box::new(default_scenario())));
    let snap = dashboard.recompute();

    let mut running = Decimal::ZERO;
    for y in &snap.years {
        running += y.fcf;
        assert_eq!(y.cumulative_fcf, running, "year {}", y.year);
        assert_eq!(y.debt + y.equity, y.capex, "year {}", y.year);
    }
}

#[test]
fn test_payback_sensitivity_reports_undetermined_as_none() {
    let input = SensitivityInput {
        scenario: default_scenario(),
        variable_1: SensitivityVariable {
            name: "cogs_pct".into(),
            min: dec!(0.35),
            max: dec!(0.95),
            step: dec!(0.60),
        },
        variable_2: SensitivityVariable {
            name: "avg_ticket".into(),
            min: dec!(50),
            max: dec!(50),
            step: dec!(1),
        },
        output_metric: OutputMetric::PaybackMonths,
    };
    let out = run_sensitivity(&input).unwrap().result;

    assert_eq!(out.matrix.len(), 2);
    assert_eq!(out.matrix[0][0], Some(dec!(47)));
    // COGS at 95% leaves nothing to recover the investment with
    assert_eq!(out.matrix[1][0], None);
    assert_eq!(out.base_case_position, (0, 0));
}
