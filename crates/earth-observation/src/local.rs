//! Local raster store: an in-process catalog behind the provider trait.
//!
//! Holds municipality boundaries, dated multi-band scenes per collection and
//! point-feature sets. Every operation is computed eagerly on a working grid
//! derived from the boundary's extent. Thumbnails are rendered in-process, so
//! no network access is ever needed.
//!
//! A catalog can be built in code (tests, fixtures) or loaded from a
//! directory holding `catalog.yaml` plus raw little-endian `f32` band files.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use tracing::{debug, info, instrument};

use heat_common::{BoundaryPolygon, BoundingBox, DateWindow, HeatError, HeatResult};
use renderer::gradient::{render_grid, render_rgb, resample_nearest, thumbnail_dimensions};
use renderer::png::create_png_auto;
use renderer::{ColorRamp, VisParams};

use crate::provider::{CloudFilter, EarthObservation, ThumbnailSource};
use crate::raster::{median_composite, mosaic, GridSpec, Raster};

/// Band name of the painted infrastructure layer.
const PAINT_BAND: &str = "constant";

/// Tuning for the local store.
#[derive(Debug, Clone)]
pub struct LocalStoreConfig {
    /// Working-grid pixel size in degrees (~100 m at the equator).
    pub pixel_size: f64,
    /// Cap on the working grid's longest side.
    pub max_grid_dimension: usize,
    /// Cap on the thumbnail's longest side.
    pub max_thumbnail_dimension: usize,
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            pixel_size: 0.001,
            max_grid_dimension: 2048,
            max_thumbnail_dimension: 512,
        }
    }
}

/// One dated image in a collection.
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub acquired: NaiveDate,
    pub properties: BTreeMap<String, f64>,
    pub raster: Raster,
}

impl Scene {
    pub fn new(id: impl Into<String>, acquired: NaiveDate, raster: Raster) -> Self {
        Self {
            id: id.into(),
            acquired,
            properties: BTreeMap::new(),
            raster,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: f64) -> Self {
        self.properties.insert(name.into(), value);
        self
    }
}

/// A resolved boundary and the working grid images are computed on.
#[derive(Debug, Clone)]
pub struct LocalBoundary {
    pub name: String,
    pub polygon: BoundaryPolygon,
    pub grid: GridSpec,
}

pub struct LocalRasterStore {
    config: LocalStoreConfig,
    boundaries: HashMap<String, BoundaryPolygon>,
    collections: HashMap<String, Vec<Scene>>,
    features: HashMap<String, Vec<(f64, f64)>>,
}

impl LocalRasterStore {
    pub fn new(config: LocalStoreConfig) -> Self {
        Self {
            config,
            boundaries: HashMap::new(),
            collections: HashMap::new(),
            features: HashMap::new(),
        }
    }

    pub fn add_boundary(&mut self, name: impl Into<String>, polygon: BoundaryPolygon) -> &mut Self {
        self.boundaries.insert(name.into(), polygon);
        self
    }

    /// Append a scene. Collection order is insertion order, which is also
    /// mosaic stacking order.
    pub fn add_scene(&mut self, collection: impl Into<String>, scene: Scene) -> &mut Self {
        self.collections.entry(collection.into()).or_default().push(scene);
        self
    }

    pub fn add_points(&mut self, collection: impl Into<String>, points: Vec<(f64, f64)>) -> &mut Self {
        self.features.entry(collection.into()).or_default().extend(points);
        self
    }

    fn scenes(&self, collection: &str) -> HeatResult<&[Scene]> {
        self.collections
            .get(collection)
            .map(Vec::as_slice)
            .ok_or_else(|| HeatError::NoCoverage(format!("collection {collection} is not in the local catalog")))
    }

    /// Resample the selected scenes onto the boundary's working grid.
    fn on_working_grid<'a, I>(&self, scenes: I, boundary: &LocalBoundary) -> Vec<Raster>
    where
        I: IntoIterator<Item = &'a Scene>,
    {
        scenes
            .into_iter()
            .filter(|s| s.raster.grid().bbox.intersects(&boundary.polygon.bbox()))
            .map(|s| s.raster.resample_to(&boundary.grid))
            .collect()
    }

    // ========================================================================
    // Catalog directory loading
    // ========================================================================

    /// Load `dir/catalog.yaml` and the band files it references.
    pub fn load_dir(dir: &Path, config: LocalStoreConfig) -> HeatResult<Self> {
        let manifest_path = dir.join("catalog.yaml");
        let yaml = std::fs::read_to_string(&manifest_path).map_err(|e| {
            HeatError::Configuration(format!("Failed to read {}: {e}", manifest_path.display()))
        })?;
        let manifest: CatalogManifest = serde_yaml::from_str(&yaml)
            .map_err(|e| HeatError::Configuration(format!("Invalid local catalog: {e}")))?;

        let mut store = Self::new(config);
        for entry in manifest.boundaries {
            store.add_boundary(entry.name, BoundaryPolygon::from_geojson(entry.geometry)?);
        }

        let mut scene_count = 0;
        for (collection, scenes) in manifest.collections {
            for entry in scenes {
                let [min_x, min_y, max_x, max_y] = entry.bbox;
                let grid = GridSpec::new(BoundingBox::new(min_x, min_y, max_x, max_y), entry.width, entry.height)?;
                let mut raster = Raster::new(grid);
                for (band, file) in entry.bands {
                    raster = raster.with_band(band, read_f32_band(&dir.join(file))?)?;
                }
                let mut scene = Scene::new(entry.id, entry.acquired, raster);
                scene.properties = entry.properties;
                store.add_scene(collection.clone(), scene);
                scene_count += 1;
            }
        }

        for (collection, points) in manifest.features {
            store.add_points(collection, points.into_iter().map(|[x, y]| (x, y)).collect());
        }

        info!(
            dir = %dir.display(),
            boundaries = store.boundaries.len(),
            scenes = scene_count,
            feature_sets = store.features.len(),
            "Loaded local raster catalog"
        );
        Ok(store)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogManifest {
    #[serde(default)]
    boundaries: Vec<BoundaryEntry>,
    #[serde(default)]
    collections: BTreeMap<String, Vec<SceneEntry>>,
    #[serde(default)]
    features: BTreeMap<String, Vec<[f64; 2]>>,
}

#[derive(Debug, Deserialize)]
struct BoundaryEntry {
    name: String,
    geometry: geojson::Geometry,
}

#[derive(Debug, Deserialize)]
struct SceneEntry {
    id: String,
    acquired: NaiveDate,
    #[serde(default)]
    properties: BTreeMap<String, f64>,
    bbox: [f64; 4],
    width: usize,
    height: usize,
    bands: BTreeMap<String, String>,
}

fn read_f32_band(path: &Path) -> HeatResult<Vec<f32>> {
    let bytes = std::fs::read(path)
        .map_err(|e| HeatError::Configuration(format!("Failed to read band file {}: {e}", path.display())))?;
    if bytes.len() % 4 != 0 {
        return Err(HeatError::Configuration(format!(
            "Band file {} is {} bytes, not a whole number of f32 values",
            path.display(),
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

// ============================================================================
// Provider implementation
// ============================================================================

#[async_trait]
impl EarthObservation for LocalRasterStore {
    type Boundary = LocalBoundary;
    type Image = Raster;

    #[instrument(skip(self))]
    async fn resolve_boundary(&self, municipality: &str) -> HeatResult<LocalBoundary> {
        let polygon = self
            .boundaries
            .get(municipality)
            .cloned()
            .ok_or_else(|| HeatError::BoundaryNotFound(municipality.to_string()))?;
        let grid = GridSpec::covering(polygon.bbox(), self.config.pixel_size, self.config.max_grid_dimension)?;
        debug!(width = grid.width, height = grid.height, "Working grid");

        Ok(LocalBoundary {
            name: municipality.to_string(),
            polygon,
            grid,
        })
    }

    #[instrument(skip(self, boundary), fields(municipality = %boundary.name))]
    async fn composite_image(
        &self,
        collection: &str,
        boundary: &LocalBoundary,
        window: &DateWindow,
        cloud: &CloudFilter,
    ) -> HeatResult<Raster> {
        let selected: Vec<&Scene> = self
            .scenes(collection)?
            .iter()
            .filter(|s| window.contains(s.acquired))
            .filter(|s| cloud.accepts(s.properties.get(&cloud.property).copied()))
            .collect();
        let rasters = self.on_working_grid(selected, boundary);

        if rasters.is_empty() {
            return Err(HeatError::NoCoverage(format!(
                "no {collection} scenes between {} and {} with {} < {} over {}",
                window.start_str(),
                window.end_str(),
                cloud.property,
                cloud.max,
                boundary.name
            )));
        }
        debug!(scenes = rasters.len(), "Median composite");

        Ok(median_composite(&rasters)?.clip(&boundary.polygon))
    }

    fn derive_index(&self, image: &Raster, band_a: &str, band_b: &str) -> HeatResult<Raster> {
        image.normalized_difference(band_a, band_b)
    }

    fn calibrate(&self, image: &Raster, band: &str, scale: f64, offset: f64) -> HeatResult<Raster> {
        image.linear(band, scale, offset)
    }

    #[instrument(skip(self, boundary), fields(municipality = %boundary.name))]
    async fn population_density(&self, collection: &str, boundary: &LocalBoundary, year: i32) -> HeatResult<Raster> {
        let window = DateWindow::calendar_year(year)?;
        let selected = self
            .scenes(collection)?
            .iter()
            .filter(|s| window.contains(s.acquired));
        let rasters = self.on_working_grid(selected, boundary);

        if rasters.is_empty() {
            return Err(HeatError::NoCoverage(format!(
                "no {collection} images for {year} over {}",
                boundary.name
            )));
        }

        Ok(mosaic(&rasters)?.clip(&boundary.polygon))
    }

    #[instrument(skip(self, boundary), fields(municipality = %boundary.name))]
    async fn rasterize_points(
        &self,
        boundary: &LocalBoundary,
        feature_sets: &[String],
        width: u32,
    ) -> HeatResult<Raster> {
        let mut total: Option<Raster> = None;
        for collection in feature_sets {
            let points: Vec<(f64, f64)> = self
                .features
                .get(collection)
                .ok_or_else(|| {
                    HeatError::NoCoverage(format!("feature collection {collection} is not in the local catalog"))
                })?
                .iter()
                .copied()
                .filter(|(x, y)| boundary.polygon.contains(*x, *y))
                .collect();
            debug!(collection = %collection, points = points.len(), "Painting features");

            let mut painted = Raster::filled(boundary.grid, PAINT_BAND, 0.0);
            painted.paint_points(PAINT_BAND, &points, 1.0, width)?;
            total = Some(match total {
                Some(sum) => sum.add(&painted)?,
                None => painted,
            });
        }

        let total = total.ok_or_else(|| HeatError::Configuration("no feature collections to rasterize".to_string()))?;
        Ok(total.self_mask().clip(&boundary.polygon))
    }

    #[instrument(skip(self, image, vis))]
    async fn render_thumbnail(&self, image: &Raster, vis: &VisParams, layer: &str) -> HeatResult<ThumbnailSource> {
        let grid = image.grid();
        let (width, height) = thumbnail_dimensions(grid.width, grid.height, self.config.max_thumbnail_dimension);
        let resample = |data: &[f32]| resample_nearest(data, grid.width, grid.height, width, height);

        let pixels = if vis.is_rgb() {
            let r = resample(image.band(&vis.bands[0])?);
            let g = resample(image.band(&vis.bands[1])?);
            let b = resample(image.band(&vis.bands[2])?);
            render_rgb([&r, &g, &b], width, height, vis.min, vis.max)
        } else {
            let ramp = ColorRamp::from_vis(vis)?;
            render_grid(&resample(image.single_band()?), width, height, &ramp)
        };

        let png = create_png_auto(&pixels, width, height)?;
        debug!(width, height, bytes = png.len(), "Rendered thumbnail");
        Ok(ThumbnailSource::Inline(png))
    }

    async fn download_thumbnail(&self, source: &ThumbnailSource, layer: &str) -> HeatResult<Vec<u8>> {
        match source {
            ThumbnailSource::Inline(png) => Ok(png.clone()),
            ThumbnailSource::Remote(_) => Err(HeatError::ThumbnailUnavailable {
                layer: layer.to_string(),
            }),
        }
    }
}
