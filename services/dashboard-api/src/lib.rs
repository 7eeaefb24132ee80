//! Urban-heat dashboard API service library.
//!
//! The router is built here so integration tests can drive it in process.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod state;
pub mod validation;

use std::sync::Arc;

use axum::extract::Extension;
use axum::routing::{get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

pub fn router(state: Arc<AppState>, prometheus: PrometheusHandle) -> Router {
    Router::new()
        // Dashboard actions
        .route("/api/diagnostics", post(handlers::run_diagnostics))
        .route("/api/recommendations", post(handlers::run_recommendations))
        .route("/api/plans", post(handlers::run_plan_generation))
        // Layers and maps
        .route("/api/layers/:municipality", get(handlers::layers_handler))
        .route("/api/maps/:municipality", get(handlers::city_map_handler))
        // Lookups
        .route("/api/municipalities/:name", get(handlers::municipality_handler))
        .route("/api/postal-codes/:cep", get(handlers::postal_code_handler))
        // Records
        .route("/api/cities", get(handlers::list_cities).post(handlers::create_city))
        .route("/api/users", get(handlers::list_users).post(handlers::create_user))
        .route("/api/users/:id", patch(handlers::update_user))
        // Health check and metrics
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(state))
        .layer(Extension(prometheus))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
