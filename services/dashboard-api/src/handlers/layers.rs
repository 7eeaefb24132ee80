//! Raw layer and map endpoints.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::Json;
use tracing::instrument;

use earth_observation::CityMap;
use heat_common::LayerBundle;

use super::ApiResult;
use crate::state::AppState;

/// GET /api/layers/:municipality
#[instrument(skip(state))]
pub async fn layers_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(municipality): Path<String>,
) -> ApiResult<Json<LayerBundle>> {
    Ok(Json(state.layers.fetch_layers(&municipality).await?))
}

/// GET /api/maps/:municipality
#[instrument(skip(state))]
pub async fn city_map_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(municipality): Path<String>,
) -> ApiResult<Json<CityMap>> {
    Ok(Json(state.layers.fetch_city_map(&municipality).await?))
}
