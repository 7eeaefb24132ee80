//! Service settings and pipeline configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;

use earth_observation::PipelineConfig;

/// Which earth-observation backend serves the layer endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Earth Engine REST API with a service account from the environment.
    EarthEngine,
    /// Rasters from a local catalog directory.
    Local,
}

/// Everything needed to build the application state.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_dir: PathBuf,
    pub database_url: String,
    pub provider: ProviderKind,
    pub local_data_dir: PathBuf,
    pub gemini_model: String,
    pub gemini_api_key: String,
    pub ibge_url: String,
    pub viacep_url: String,
}

/// Load `layers.yaml` from the config directory; a missing file means defaults.
pub fn load_pipeline_config(config_dir: &Path) -> Result<PipelineConfig> {
    let path = config_dir.join("layers.yaml");
    PipelineConfig::load_or_default(&path).with_context(|| format!("loading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_layers_file_uses_defaults() {
        let dir = std::env::temp_dir().join("dashboard-api-no-such-config-dir");
        let config = load_pipeline_config(&dir).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_shipped_layers_file_parses() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config");
        // The shipped file documents the defaults, so the two must agree.
        assert_eq!(load_pipeline_config(&dir).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(ProviderKind::from_str("earth-engine", false).unwrap(), ProviderKind::EarthEngine);
        assert_eq!(ProviderKind::from_str("local", false).unwrap(), ProviderKind::Local);
    }
}
