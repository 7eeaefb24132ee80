//! HTTP handlers.
//!
//! - `actions`: the three envelope-wrapped dashboard actions
//! - `layers`: raw layer bundles and city maps
//! - `lookup`: municipality profiles and postal codes
//! - `admin`: city and user records
//! - `health`: liveness and Prometheus metrics

pub mod actions;
pub mod admin;
pub mod health;
pub mod layers;
pub mod lookup;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use heat_common::{HeatError, HeatResult};

pub use actions::{run_diagnostics, run_plan_generation, run_recommendations};
pub use admin::{create_city, create_user, list_cities, list_users, update_user};
pub use health::{health_handler, metrics_handler};
pub use layers::{city_map_handler, layers_handler};
pub use lookup::{municipality_handler, postal_code_handler};

/// A [`HeatError`] rendered as `{"error": ...}` with its mapped status.
#[derive(Debug)]
pub struct ApiError(pub HeatError);

impl From<HeatError> for ApiError {
    fn from(err: HeatError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, status = status.as_u16(), "Request failed");
        } else {
            warn!(error = %self.0, status = status.as_u16(), "Request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Unwrap a JSON body, turning a malformed one into a validation error.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> HeatResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| HeatError::invalid("body", rejection.body_text()))
}
