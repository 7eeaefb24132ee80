//! The dashboard actions: diagnosis, planting recommendations, climate plan.
//!
//! Responses always use the `{success, data?, error?}` envelope. Validation
//! problems are returned verbatim with 400. Anything that fails further
//! along is logged in full and replaced by a fixed message with 502.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use genai::{
    diagnose_urban_heat_islands, generate_climate_plan, generate_planting_recommendations, ClimatePlanOutput,
    DiagnosisInput, DiagnosisOutput, PlantingOutput,
};
use heat_common::{HeatError, HeatResult};

use super::json_body;
use crate::metrics::record_action;
use crate::state::AppState;
use crate::validation::{DiagnosticsRequest, PlanRequest, RecommendationsRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Diagnostics,
    Recommendations,
    PlanGeneration,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Diagnostics => "runDiagnostics",
            Action::Recommendations => "runRecommendations",
            Action::PlanGeneration => "runPlanGeneration",
        }
    }

    /// What the caller sees when the action fails past validation.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Action::Diagnostics => "An error occurred during the diagnosis.",
            Action::Recommendations => "Failed to generate recommendations",
            Action::PlanGeneration => "Failed to generate the plan",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Wrap an action result, choosing status and message.
pub fn respond<T: Serialize>(action: Action, result: HeatResult<T>, start: Instant) -> Response {
    let (status, outcome, envelope) = match result {
        Ok(data) => (
            StatusCode::OK,
            "success",
            Envelope {
                success: true,
                data: Some(data),
                error: None,
            },
        ),
        Err(HeatError::Validation(errors)) => {
            let message = HeatError::Validation(errors).to_string();
            warn!(action = action.name(), error = %message, "Action rejected");
            (
                StatusCode::BAD_REQUEST,
                "invalid",
                Envelope {
                    success: false,
                    data: None,
                    error: Some(message),
                },
            )
        }
        Err(e) => {
            error!(action = action.name(), error = %e, error_debug = ?e, "Action failed");
            (
                StatusCode::BAD_GATEWAY,
                "error",
                Envelope {
                    success: false,
                    data: None,
                    error: Some(action.failure_message().to_string()),
                },
            )
        }
    };

    record_action(action.name(), outcome, start.elapsed());
    (status, Json(envelope)).into_response()
}

/// The diagnosis together with the layers it was computed from.
#[derive(Debug, Serialize)]
pub struct DiagnosticsData {
    pub output: DiagnosisOutput,
    pub input: DiagnosisInput,
}

/// POST /api/diagnostics
#[instrument(skip_all)]
pub async fn run_diagnostics(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<DiagnosticsRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    respond(Action::Diagnostics, diagnostics(&state, payload).await, start)
}

async fn diagnostics(
    state: &AppState,
    payload: Result<Json<DiagnosticsRequest>, JsonRejection>,
) -> HeatResult<DiagnosticsData> {
    let request = json_body(payload)?;
    request.validate()?;

    let municipality = request.municipality_name.trim();
    let layers = state.layers.fetch_layers(municipality).await?;
    info!(municipality, "Layers ready, running diagnosis");

    let input = DiagnosisInput::new(request.municipality_description.trim(), layers);
    let output = diagnose_urban_heat_islands(state.model.as_ref(), &input).await?;
    Ok(DiagnosticsData { output, input })
}

/// POST /api/recommendations
#[instrument(skip_all)]
pub async fn run_recommendations(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<RecommendationsRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let result: HeatResult<PlantingOutput> = async {
        let input = json_body(payload)?.into_input()?;
        generate_planting_recommendations(state.model.as_ref(), &input).await
    }
    .await;
    respond(Action::Recommendations, result, start)
}

/// POST /api/plans
#[instrument(skip_all)]
pub async fn run_plan_generation(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let result: HeatResult<ClimatePlanOutput> = async {
        let input = json_body(payload)?.into_input()?;
        generate_climate_plan(state.model.as_ref(), &input).await
    }
    .await;
    respond(Action::PlanGeneration, result, start)
}
