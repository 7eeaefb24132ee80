//! Pipeline configuration: dataset ids, date window, calibration constants and
//! visualization parameters.
//!
//! Loaded from `config/layers.yaml`. Every section has built-in defaults, so a
//! partial file (or no file at all) still yields a working pipeline.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use heat_common::{DateWindow, HeatError, HeatResult, LayerKind};
use renderer::{ColorRamp, VisParams};

use crate::provider::CloudFilter;

/// Kelvin to Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Root configuration loaded from a layers YAML file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub boundaries: BoundaryConfig,
    pub window: WindowConfig,
    pub imagery: ImageryConfig,
    pub population: PopulationConfig,
    pub infrastructure: InfrastructureConfig,
    pub city_map: CityMapConfig,
    pub visualization: VisualizationConfig,
    pub thumbnail: ThumbnailConfig,
}

/// Municipality feature catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    pub collection: String,
    /// Property compared for equality with the municipality name.
    pub name_property: String,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            collection: "projects/ee-mateusbatista/assets/Brasil_Mun".to_string(),
            name_property: "NM_MUN".to_string(),
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// Acquisition window. The end date is exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            start: ymd(2023, 1, 1),
            end: ymd(2023, 12, 31),
        }
    }
}

/// Surface reflectance and thermal imagery (Landsat 9 Level 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageryConfig {
    pub collection: String,
    pub cloud_property: String,
    /// Scenes at or above this cover are excluded.
    pub max_cloud_cover: f64,
    pub nir_band: String,
    pub red_band: String,
    pub thermal_band: String,
    pub thermal_scale: f64,
    /// Offset in Kelvin; the pipeline subtracts [`KELVIN_OFFSET`] on top.
    pub thermal_offset: f64,
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            collection: "LANDSAT/LC09/C02/T1_L2".to_string(),
            cloud_property: "CLOUD_COVER".to_string(),
            max_cloud_cover: 20.0,
            nir_band: "SR_B5".to_string(),
            red_band: "SR_B4".to_string(),
            thermal_band: "ST_B10".to_string(),
            thermal_scale: 0.00341802,
            thermal_offset: 149.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub collection: String,
    pub year: i32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            collection: "WorldPop/GP/100m/pop".to_string(),
            year: 2020,
        }
    }
}

/// Point collections painted into the infrastructure layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfrastructureConfig {
    pub collections: Vec<String>,
    /// Paint width in pixels.
    pub paint_width: u32,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            collections: vec![
                "projects/ee-mateusbatista/assets/hospitais_brasil_osm_2024".to_string(),
                "projects/ee-mateusbatista/assets/escolas_brasil_osm_2024".to_string(),
            ],
            paint_width: 2,
        }
    }
}

/// True-color map imagery (Sentinel-2 surface reflectance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityMapConfig {
    pub collection: String,
    pub cloud_property: String,
    pub max_cloud_cover: f64,
    pub vis: VisParams,
}

impl Default for CityMapConfig {
    fn default() -> Self {
        Self {
            collection: "COPERNICUS/S2_SR_HARMONIZED".to_string(),
            cloud_property: "CLOUDY_PIXEL_PERCENTAGE".to_string(),
            max_cloud_cover: 10.0,
            vis: VisParams::rgb(["B4", "B3", "B2"], 0.0, 3000.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    pub ndvi: VisParams,
    pub lst: VisParams,
    pub population: VisParams,
    pub infrastructure: VisParams,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            ndvi: VisParams::new(-0.2, 0.8, &["blue", "white", "green"]),
            lst: VisParams::new(20.0, 40.0, &["blue", "green", "yellow", "red"]),
            population: VisParams::new(0.0, 1000.0, &["white", "yellow", "orange", "red"]),
            infrastructure: VisParams::solid("purple"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Longest side of locally rendered thumbnails, in pixels.
    pub max_dimension: usize,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self { max_dimension: 512 }
    }
}

impl PipelineConfig {
    /// Parse and validate YAML text.
    pub fn from_yaml_str(yaml: &str) -> HeatResult<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)
            .map_err(|e| HeatError::Configuration(format!("Invalid layers config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a layers YAML file.
    pub fn load(path: &Path) -> HeatResult<Self> {
        debug!(path = %path.display(), "Loading layers config");
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            HeatError::Configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Load `path` if it exists, otherwise fall back to the defaults.
    pub fn load_or_default(path: &Path) -> HeatResult<Self> {
        if path.exists() {
            let config = Self::load(path)?;
            info!(path = %path.display(), "Loaded layers config");
            Ok(config)
        } else {
            info!(path = %path.display(), "No layers config found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> HeatResult<()> {
        let fail = |msg: String| Err(HeatError::Configuration(msg));

        if self.window.end <= self.window.start {
            return fail(format!(
                "window end {} must be after start {}",
                self.window.end, self.window.start
            ));
        }
        if self.imagery.max_cloud_cover <= 0.0 || self.city_map.max_cloud_cover <= 0.0 {
            return fail("max_cloud_cover must be positive".to_string());
        }
        if self.imagery.thermal_scale == 0.0 {
            return fail("thermal_scale must be non-zero".to_string());
        }
        if self.infrastructure.collections.is_empty() {
            return fail("infrastructure needs at least one point collection".to_string());
        }
        if self.infrastructure.paint_width == 0 {
            return fail("infrastructure paint_width must be at least 1".to_string());
        }
        if self.thumbnail.max_dimension == 0 {
            return fail("thumbnail max_dimension must be at least 1".to_string());
        }
        if !self.city_map.vis.is_rgb() {
            return fail("city_map vis needs three bands and no palette".to_string());
        }

        for kind in LayerKind::ALL {
            ColorRamp::from_vis(self.vis_for(kind))
                .map_err(|e| HeatError::Configuration(format!("{kind} visualization: {e}")))?;
        }
        Ok(())
    }

    pub fn date_window(&self) -> HeatResult<DateWindow> {
        DateWindow::new(self.window.start, self.window.end)
    }

    pub fn imagery_cloud_filter(&self) -> CloudFilter {
        CloudFilter::new(&self.imagery.cloud_property, self.imagery.max_cloud_cover)
    }

    pub fn city_map_cloud_filter(&self) -> CloudFilter {
        CloudFilter::new(&self.city_map.cloud_property, self.city_map.max_cloud_cover)
    }

    /// Combined thermal offset straight to degrees Celsius.
    pub fn lst_offset_celsius(&self) -> f64 {
        self.imagery.thermal_offset - KELVIN_OFFSET
    }

    pub fn vis_for(&self, kind: LayerKind) -> &VisParams {
        match kind {
            LayerKind::Ndvi => &self.visualization.ndvi,
            LayerKind::Lst => &self.visualization.lst,
            LayerKind::PopulationDensity => &self.visualization.population,
            LayerKind::Infrastructure => &self.visualization.infrastructure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = PipelineConfig::default();
        config.validate().unwrap();

        assert_eq!(config.boundaries.name_property, "NM_MUN");
        assert_eq!(config.imagery.collection, "LANDSAT/LC09/C02/T1_L2");
        assert_eq!(config.imagery.max_cloud_cover, 20.0);
        assert_eq!(config.population.year, 2020);
        assert_eq!(config.infrastructure.collections.len(), 2);
        assert_eq!(config.date_window().unwrap().start_str(), "2023-01-01");
        assert_eq!(config.date_window().unwrap().end_str(), "2023-12-31");
        assert!((config.lst_offset_celsius() - (-124.15)).abs() < 1e-9);
        assert_eq!(config.vis_for(LayerKind::Lst).palette, vec!["blue", "green", "yellow", "red"]);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = PipelineConfig::from_yaml_str(
            r#"
imagery:
  max_cloud_cover: 35
population:
  year: 2021
"#,
        )
        .unwrap();
        assert_eq!(config.imagery.max_cloud_cover, 35.0);
        assert_eq!(config.imagery.nir_band, "SR_B5");
        assert_eq!(config.population.year, 2021);
        assert_eq!(config.population.collection, "WorldPop/GP/100m/pop");
        assert_eq!(config.thumbnail.max_dimension, 512);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let backwards = "window:\n  start: 2023-12-31\n  end: 2023-01-01\n";
        assert!(matches!(
            PipelineConfig::from_yaml_str(backwards),
            Err(HeatError::Configuration(_))
        ));

        let bad_palette = "visualization:\n  ndvi:\n    min: 0\n    max: 1\n    palette: [chartreuse-ish]\n";
        let err = PipelineConfig::from_yaml_str(bad_palette).unwrap_err();
        assert!(err.to_string().contains("NDVI"));

        let non_ascii_palette = "visualization:\n  lst:\n    min: 0\n    max: 1\n    palette: [\"aéabc\", red]\n";
        let err = PipelineConfig::from_yaml_str(non_ascii_palette).unwrap_err();
        assert!(matches!(err, HeatError::Configuration(_)));
        assert!(err.to_string().contains("LST"));

        let no_points = "infrastructure:\n  collections: []\n";
        assert!(PipelineConfig::from_yaml_str(no_points).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = PipelineConfig::load_or_default(Path::new("/nonexistent/layers.yaml")).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }
}
