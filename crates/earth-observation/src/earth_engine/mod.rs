//! Earth Engine REST client.
//!
//! Images are lazy [`Expr`] graphs; only three calls touch the network:
//! - `POST v1/projects/{project}/value:compute` to check a boundary exists
//! - `POST v1/projects/{project}/thumbnails` to register a PNG thumbnail
//! - `GET v1/{name}:getPixels` to fetch it
//!
//! Every call carries a bearer token from the injected [`CredentialProvider`].

pub mod expr;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use heat_common::{DateWindow, HeatError, HeatResult};
use renderer::VisParams;

use crate::config::BoundaryConfig;
use crate::credentials::CredentialProvider;
use crate::provider::{CloudFilter, EarthObservation, ThumbnailSource};

pub use expr::Expr;

const SERVICE: &str = "Earth Engine";
pub const DEFAULT_BASE_URL: &str = "https://earthengine.googleapis.com";

/// Connection settings for the REST API.
#[derive(Debug, Clone)]
pub struct EarthEngineConfig {
    pub base_url: String,
    pub project: String,
    pub boundaries: BoundaryConfig,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl EarthEngineConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            project: project.into(),
            boundaries: BoundaryConfig::default(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// A municipality boundary as an unevaluated geometry.
#[derive(Debug, Clone)]
pub struct EeBoundary {
    pub name: String,
    pub geometry: Expr,
}

pub struct EarthEngineClient {
    client: Client,
    config: EarthEngineConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl EarthEngineClient {
    pub fn new(config: EarthEngineConfig, credentials: Arc<dyn CredentialProvider>) -> HeatResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| HeatError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    fn project_url(&self, method: &str) -> String {
        format!(
            "{}/v1/projects/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.project,
            method
        )
    }

    async fn authorized(&self, request: RequestBuilder) -> HeatResult<RequestBuilder> {
        let token = self.credentials.access_token().await?;
        Ok(request.bearer_auth(token.token))
    }

    async fn post_json(&self, url: &str, body: &Value) -> HeatResult<Value> {
        let request = self.authorized(self.client.post(url).json(body)).await?;
        let response = request
            .send()
            .await
            .map_err(|e| HeatError::upstream(SERVICE, None, e.to_string()))?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| HeatError::upstream(SERVICE, None, format!("Malformed response: {e}")))
    }

    /// Evaluate a graph and return its `result`.
    #[instrument(skip(self, expr), fields(function = expr.function_name().unwrap_or("constant")))]
    pub async fn compute(&self, expr: &Expr) -> HeatResult<Value> {
        let body = json!({ "expression": expr.to_expression() });
        let mut response = self.post_json(&self.project_url("value:compute"), &body).await?;
        Ok(response
            .get_mut("result")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    fn boundary_collection(&self, municipality: &str) -> Expr {
        let boundaries = &self.config.boundaries;
        expr::filter_eq(
            expr::load_table(&boundaries.collection),
            &boundaries.name_property,
            municipality,
        )
    }
}

/// Map non-2xx responses onto typed errors, preferring the API's own message.
async fn check_status(response: Response) -> HeatResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);

    warn!(status = status.as_u16(), message = %message, "Earth Engine request failed");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(HeatError::Authentication(message)),
        _ => Err(HeatError::upstream(SERVICE, Some(status.as_u16()), message)),
    }
}

#[async_trait]
impl EarthObservation for EarthEngineClient {
    type Boundary = EeBoundary;
    type Image = Expr;

    #[instrument(skip(self))]
    async fn resolve_boundary(&self, municipality: &str) -> HeatResult<EeBoundary> {
        let matches = self.boundary_collection(municipality);
        let count = self.compute(&expr::size(matches.clone())).await?;
        if count.as_u64().unwrap_or(0) == 0 {
            return Err(HeatError::BoundaryNotFound(municipality.to_string()));
        }
        debug!(matches = %count, "Boundary resolved");

        Ok(EeBoundary {
            name: municipality.to_string(),
            geometry: expr::feature_geometry(expr::first(matches)),
        })
    }

    async fn composite_image(
        &self,
        collection: &str,
        boundary: &EeBoundary,
        window: &DateWindow,
        cloud: &CloudFilter,
    ) -> HeatResult<Expr> {
        let scenes = expr::filter_bounds(expr::image_collection(collection), boundary.geometry.clone());
        let scenes = expr::filter_date(scenes, window);
        let scenes = expr::filter_lt(scenes, &cloud.property, cloud.max);
        Ok(expr::clip(expr::median(scenes), boundary.geometry.clone()))
    }

    fn derive_index(&self, image: &Expr, band_a: &str, band_b: &str) -> HeatResult<Expr> {
        Ok(expr::normalized_difference(image.clone(), band_a, band_b))
    }

    fn calibrate(&self, image: &Expr, band: &str, scale: f64, offset: f64) -> HeatResult<Expr> {
        Ok(expr::linear(image.clone(), band, scale, offset))
    }

    async fn population_density(&self, collection: &str, boundary: &EeBoundary, year: i32) -> HeatResult<Expr> {
        let window = DateWindow::calendar_year(year)?;
        let images = expr::filter_date(expr::image_collection(collection), &window);
        Ok(expr::clip(expr::mosaic(images), boundary.geometry.clone()))
    }

    async fn rasterize_points(&self, boundary: &EeBoundary, feature_sets: &[String], width: u32) -> HeatResult<Expr> {
        // Painted onto a zero image rather than an empty one: adding two
        // partially masked images would keep only pixels painted in both.
        let painted = feature_sets.iter().map(|id| {
            let points = expr::filter_bounds(expr::load_table(id), boundary.geometry.clone());
            expr::paint(expr::constant_image(0.0), points, 1.0, width)
        });
        let total = painted
            .reduce(expr::add)
            .ok_or_else(|| HeatError::Configuration("no feature collections to rasterize".to_string()))?;
        Ok(expr::clip(expr::self_mask(total), boundary.geometry.clone()))
    }

    #[instrument(skip(self, image, vis))]
    async fn render_thumbnail(&self, image: &Expr, vis: &VisParams, layer: &str) -> HeatResult<ThumbnailSource> {
        let body = json!({
            "expression": expr::visualize(image.clone(), vis).to_expression(),
            "fileFormat": "PNG",
        });
        let response = self.post_json(&self.project_url("thumbnails"), &body).await?;

        let name = response
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| HeatError::ThumbnailUnavailable {
                layer: layer.to_string(),
            })?;

        let url = format!("{}/v1/{}:getPixels", self.config.base_url.trim_end_matches('/'), name);
        info!(url = %url, "Thumbnail registered");
        Ok(ThumbnailSource::Remote(url))
    }

    #[instrument(skip(self, source))]
    async fn download_thumbnail(&self, source: &ThumbnailSource, layer: &str) -> HeatResult<Vec<u8>> {
        let url = match source {
            ThumbnailSource::Inline(png) => return Ok(png.clone()),
            ThumbnailSource::Remote(url) => url,
        };

        let request = self.authorized(self.client.get(url)).await?;
        let response = request
            .send()
            .await
            .map_err(|e| HeatError::upstream(SERVICE, None, format!("{layer} thumbnail download: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Thumbnail download failed");
            return Err(HeatError::ThumbnailFetch {
                layer: layer.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| HeatError::upstream(SERVICE, None, format!("{layer} thumbnail body: {e}")))?;
        debug!(bytes = bytes.len(), "Downloaded thumbnail");
        Ok(bytes.to_vec())
    }
}
