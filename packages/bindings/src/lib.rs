use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use bizplan_core::config::ScenarioConfig;
use bizplan_core::dashboard::{
    default_scenario, Collaborators, Dashboard, ModelState, ModelStateSource,
};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Plan stages
// ---------------------------------------------------------------------------

#[napi]
pub fn allocate_capex(input_json: String) -> NapiResult<String> {
    let input: bizplan_core::capex::CapexInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = bizplan_core::capex::allocate_capex(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn project_revenue(input_json: String) -> NapiResult<String> {
    let input: bizplan_core::revenue::RevenueInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = bizplan_core::revenue::project_revenue(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn derive_cash_flows(input_json: String) -> NapiResult<String> {
    let input: bizplan_core::cash_flow::CashFlowInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = bizplan_core::cash_flow::derive_cash_flows(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn resolve_discount_rates(input_json: String) -> NapiResult<String> {
    let input: bizplan_core::valuation::DiscountRateInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        bizplan_core::valuation::resolve_discount_rates(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn value_cash_flows(input_json: String) -> NapiResult<String> {
    let input: bizplan_core::valuation::ValuationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = bizplan_core::valuation::value_cash_flows(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Deserialize, Default)]
struct DashboardRequest {
    #[serde(default)]
    scenario: Option<ScenarioConfig>,
    #[serde(default)]
    model_state: Option<ModelState>,
}

struct HostModelState(ModelState);

impl ModelStateSource for HostModelState {
    fn model_state(&self) -> Option<ModelState> {
        Some(self.0.clone())
    }
}

/// Full plan with every stage output.
#[napi]
pub fn compute_plan(input_json: String) -> NapiResult<String> {
    let scenario: ScenarioConfig = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = bizplan_core::dashboard::compute_plan(&scenario).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Dashboard snapshot; never fails on model errors, which fall back to the
/// base-case figures with the error listed in `warnings`.
#[napi]
pub fn compute_dashboard(input_json: String) -> NapiResult<String> {
    let request: DashboardRequest = if input_json.trim().is_empty() {
        DashboardRequest::default()
    } else {
        serde_json::from_str(&input_json).map_err(to_napi_error)?
    };

    let scenario = request.scenario.unwrap_or_else(default_scenario);
    let mut collaborators = Collaborators::new(Box::new(scenario));
    if let Some(state) = request.model_state {
        collaborators = collaborators.with_model_state(Box::new(HostModelState(state)));
    }

    let mut dashboard = Dashboard::new(collaborators);
    serde_json::to_string(dashboard.recompute()).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[napi]
pub fn sensitivity_matrix(input_json: String) -> NapiResult<String> {
    let input: bizplan_core::scenarios::SensitivityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = bizplan_core::scenarios::run_sensitivity(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
