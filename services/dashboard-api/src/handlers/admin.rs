//! City and user management.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use heat_common::{City, NewCity, NewUser, User, UserPatch};

use super::{json_body, ApiResult};
use crate::state::AppState;

/// GET /api/cities
pub async fn list_cities(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Json<Vec<City>>> {
    Ok(Json(state.cities.list().await?))
}

/// POST /api/cities
#[instrument(skip_all)]
pub async fn create_city(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<NewCity>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<City>)> {
    let new = json_body(payload)?;
    let city = state.cities.create(&new).await?;
    Ok((StatusCode::CREATED, Json(city)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    pub city_id: Option<String>,
}

/// GET /api/users[?cityId=...]
pub async fn list_users(
    Extension(state): Extension<Arc<AppState>>,
    Query(filter): Query<UserFilter>,
) -> ApiResult<Json<Vec<User>>> {
    let users = match filter.city_id {
        Some(city_id) => state.users.list_by_city(&city_id).await?,
        None => state.users.list().await?,
    };
    Ok(Json(users))
}

/// POST /api/users
#[instrument(skip_all)]
pub async fn create_user(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let new = json_body(payload)?;
    let user = state.users.create(&new).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PATCH /api/users/:id
#[instrument(skip(state, payload))]
pub async fn update_user(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UserPatch>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let patch = json_body(payload)?;
    Ok(Json(state.users.update(&id, &patch).await?))
}
