//! The earth-observation provider abstraction.
//!
//! A provider turns catalog ids and a municipality boundary into images, and
//! images into PNG thumbnails. The Earth Engine client builds lazy expression
//! graphs; the local raster store computes eagerly. The layer fetcher only
//! sees this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use heat_common::{DateWindow, HeatResult};
use renderer::VisParams;

/// Scene-level metadata filter: keep scenes whose `property` is strictly
/// below `max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudFilter {
    pub property: String,
    pub max: f64,
}

impl CloudFilter {
    pub fn new(property: impl Into<String>, max: f64) -> Self {
        Self {
            property: property.into(),
            max,
        }
    }

    /// Scenes missing the property never pass.
    pub fn accepts(&self, value: Option<f64>) -> bool {
        matches!(value, Some(v) if v < self.max)
    }
}

/// Where a rendered thumbnail can be retrieved from.
#[derive(Debug, Clone, PartialEq)]
pub enum ThumbnailSource {
    /// A remote resource fetched with an HTTP GET.
    Remote(String),
    /// PNG bytes already rendered in-process.
    Inline(Vec<u8>),
}

/// Trait for earth-observation backends.
///
/// Operations mirror the layer pipeline one step at a time. Implementations
/// decide whether each step does work immediately or only describes it.
#[async_trait]
pub trait EarthObservation: Send + Sync {
    /// A resolved municipality boundary.
    type Boundary: Send + Sync;
    /// An image (or a description of one).
    type Image: Send + Sync;

    /// Look up the boundary of `municipality` in the feature catalog.
    ///
    /// Errors with `BoundaryNotFound` when nothing matches.
    async fn resolve_boundary(&self, municipality: &str) -> HeatResult<Self::Boundary>;

    /// Per-pixel median of `collection` over `window`, filtered by `cloud`,
    /// bounded by and clipped to `boundary`.
    async fn composite_image(
        &self,
        collection: &str,
        boundary: &Self::Boundary,
        window: &DateWindow,
        cloud: &CloudFilter,
    ) -> HeatResult<Self::Image>;

    /// Normalized difference `(a - b) / (a + b)`.
    fn derive_index(&self, image: &Self::Image, band_a: &str, band_b: &str) -> HeatResult<Self::Image>;

    /// Linear calibration `band * scale + offset`.
    fn calibrate(&self, image: &Self::Image, band: &str, scale: f64, offset: f64) -> HeatResult<Self::Image>;

    /// Mosaic of the `collection` images for `year`, clipped to `boundary`.
    async fn population_density(
        &self,
        collection: &str,
        boundary: &Self::Boundary,
        year: i32,
    ) -> HeatResult<Self::Image>;

    /// Paint each point collection (value 1, `width` pixels) onto an empty
    /// raster, sum them and mask zeros.
    async fn rasterize_points(
        &self,
        boundary: &Self::Boundary,
        feature_sets: &[String],
        width: u32,
    ) -> HeatResult<Self::Image>;

    /// Apply visualization parameters and produce a PNG thumbnail source.
    async fn render_thumbnail(
        &self,
        image: &Self::Image,
        vis: &VisParams,
        layer: &str,
    ) -> HeatResult<ThumbnailSource>;

    /// Retrieve the PNG bytes behind a thumbnail source.
    ///
    /// `layer` only labels errors and logs.
    async fn download_thumbnail(&self, source: &ThumbnailSource, layer: &str) -> HeatResult<Vec<u8>>;
}
