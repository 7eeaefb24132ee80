//! Municipality profile and postal-code endpoints.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::Json;
use serde::Serialize;
use tracing::instrument;

use genai::describe_city;
use heat_common::{CityProfile, PostalAddress};

use super::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MunicipalityInfo {
    pub profile: CityProfile,
    pub description: String,
}

/// GET /api/municipalities/:name
#[instrument(skip(state))]
pub async fn municipality_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<MunicipalityInfo>> {
    let profile = state.gazetteer.city_profile(&name).await?;
    let description = describe_city(state.model.as_ref(), &profile).await?.description;
    Ok(Json(MunicipalityInfo { profile, description }))
}

/// GET /api/postal-codes/:cep
#[instrument(skip(state))]
pub async fn postal_code_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(cep): Path<String>,
) -> ApiResult<Json<PostalAddress>> {
    Ok(Json(state.gazetteer.postal_code(&cep).await?))
}
