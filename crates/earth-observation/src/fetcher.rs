//! The layer pipeline: boundary, composite, derived layers, thumbnails.
//!
//! Steps run strictly in order against one provider. The only concurrency is
//! the final fan-out of the four thumbnail downloads, where any failure fails
//! the whole bundle.

use std::time::Instant;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use heat_common::{HeatError, HeatResult, LayerBundle, LayerKind};
use renderer::encode_png_data_uri;
use renderer::png::validate_png;

use crate::config::PipelineConfig;
use crate::provider::{EarthObservation, ThumbnailSource};

const CITY_MAP_LABEL: &str = "City map";

/// A true-color satellite map of a municipality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityMap {
    pub map_data_uri: String,
}

/// Object-safe entry point used by the HTTP layer.
#[async_trait]
pub trait LayerSource: Send + Sync {
    /// The four diagnosis layers for `municipality`.
    async fn fetch_layers(&self, municipality: &str) -> HeatResult<LayerBundle>;

    /// A true-color map of `municipality`.
    async fn fetch_city_map(&self, municipality: &str) -> HeatResult<CityMap>;
}

/// Runs the layer pipeline against any [`EarthObservation`] provider.
pub struct LayerFetcher<P> {
    provider: P,
    config: PipelineConfig,
}

impl<P: EarthObservation> LayerFetcher<P> {
    pub fn new(provider: P, config: PipelineConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch all four layers, recording outcome metrics.
    #[instrument(skip(self))]
    pub async fn fetch(&self, municipality: &str) -> HeatResult<LayerBundle> {
        let start = Instant::now();
        let result = self.build_bundle(municipality).await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("layer_fetch_total", "outcome" => outcome).increment(1);
        metrics::histogram!("layer_fetch_duration_seconds").record(start.elapsed().as_secs_f64());

        match &result {
            Ok(_) => info!(elapsed_ms = start.elapsed().as_millis() as u64, "Fetched layer bundle"),
            Err(e) => error!(error = %e, "Layer fetch failed"),
        }
        result
    }

    async fn build_bundle(&self, municipality: &str) -> HeatResult<LayerBundle> {
        let municipality = checked_name(municipality)?;
        let provider = &self.provider;
        let imagery = &self.config.imagery;

        let boundary = provider.resolve_boundary(municipality).await?;
        let window = self.config.date_window()?;

        let composite = provider
            .composite_image(&imagery.collection, &boundary, &window, &self.config.imagery_cloud_filter())
            .await?;
        let ndvi = provider.derive_index(&composite, &imagery.nir_band, &imagery.red_band)?;
        let lst = provider.calibrate(
            &composite,
            &imagery.thermal_band,
            imagery.thermal_scale,
            self.config.lst_offset_celsius(),
        )?;

        let population = provider
            .population_density(&self.config.population.collection, &boundary, self.config.population.year)
            .await?;
        let infrastructure = provider
            .rasterize_points(
                &boundary,
                &self.config.infrastructure.collections,
                self.config.infrastructure.paint_width,
            )
            .await?;

        let layers = [
            (LayerKind::Ndvi, ndvi),
            (LayerKind::Lst, lst),
            (LayerKind::PopulationDensity, population),
            (LayerKind::Infrastructure, infrastructure),
        ];

        let mut sources = Vec::with_capacity(layers.len());
        for (kind, image) in &layers {
            let source = provider
                .render_thumbnail(image, self.config.vis_for(*kind), kind.label())
                .await?;
            sources.push((*kind, source));
        }

        let downloads = sources.iter().map(|(kind, source)| async move {
            let uri = self.download_data_uri(source, kind.label()).await?;
            Ok::<_, HeatError>((*kind, uri))
        });
        let uris = try_join_all(downloads).await?;

        LayerBundle::from_layers(uris)
    }

    /// Fetch the true-color city map.
    #[instrument(skip(self))]
    pub async fn city_map(&self, municipality: &str) -> HeatResult<CityMap> {
        let municipality = checked_name(municipality)?;
        let map = &self.config.city_map;

        let boundary = self.provider.resolve_boundary(municipality).await?;
        let window = self.config.date_window()?;
        let composite = self
            .provider
            .composite_image(&map.collection, &boundary, &window, &self.config.city_map_cloud_filter())
            .await?;

        let source = self
            .provider
            .render_thumbnail(&composite, &map.vis, CITY_MAP_LABEL)
            .await?;
        let map_data_uri = self.download_data_uri(&source, CITY_MAP_LABEL).await?;
        info!("Fetched city map");
        Ok(CityMap { map_data_uri })
    }

    /// Download, check the bytes really are a PNG, and embed them.
    async fn download_data_uri(&self, source: &ThumbnailSource, label: &str) -> HeatResult<String> {
        let bytes = self.provider.download_thumbnail(source, label).await?;
        let (width, height) = validate_png(&bytes).map_err(|e| match e {
            HeatError::InvalidImage(msg) => HeatError::InvalidImage(format!("{label} thumbnail: {msg}")),
            other => other,
        })?;
        debug!(layer = label, width, height, bytes = bytes.len(), "Thumbnail validated");
        Ok(encode_png_data_uri(&bytes))
    }
}

fn checked_name(municipality: &str) -> HeatResult<&str> {
    let trimmed = municipality.trim();
    if trimmed.is_empty() {
        return Err(HeatError::invalid("municipalityName", "Municipality name is required."));
    }
    Ok(trimmed)
}

#[async_trait]
impl<P: EarthObservation> LayerSource for LayerFetcher<P> {
    async fn fetch_layers(&self, municipality: &str) -> HeatResult<LayerBundle> {
        self.fetch(municipality).await
    }

    async fn fetch_city_map(&self, municipality: &str) -> HeatResult<CityMap> {
        self.city_map(municipality).await
    }
}
