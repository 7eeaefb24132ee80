//! Application state and shared resources.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use docstore::{CityRepository, DocumentStore, SqliteDocumentStore, UserRepository};
use earth_observation::{
    EarthEngineClient, EarthEngineConfig, LayerFetcher, LayerSource, LocalRasterStore, LocalStoreConfig,
    PipelineConfig, ServiceAccount, ServiceAccountKey,
};
use gazetteer::{Gazetteer, GazetteerConfig, PublicGazetteer};
use genai::{GeminiClient, GeminiConfig, PromptModel};

use crate::config::{load_pipeline_config, ProviderKind, Settings};

/// Shared application state.
pub struct AppState {
    pub layers: Arc<dyn LayerSource>,
    pub model: Arc<dyn PromptModel>,
    pub gazetteer: Arc<dyn Gazetteer>,
    pub cities: CityRepository,
    pub users: UserRepository,
}

impl AppState {
    /// Assemble state from already-built parts.
    pub fn from_parts(
        layers: Arc<dyn LayerSource>,
        model: Arc<dyn PromptModel>,
        gazetteer: Arc<dyn Gazetteer>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            layers,
            model,
            gazetteer,
            cities: CityRepository::new(store.clone()),
            users: UserRepository::new(store),
        }
    }

    pub async fn new(settings: &Settings) -> Result<Self> {
        let pipeline = load_pipeline_config(&settings.config_dir)?;
        let layers = layer_source(settings, pipeline)?;

        let mut gemini = GeminiConfig::new(settings.gemini_api_key.clone());
        gemini.model = settings.gemini_model.clone();
        let model = GeminiClient::new(gemini).context("creating Gemini client")?;

        let gazetteer = PublicGazetteer::new(&GazetteerConfig {
            ibge_url: settings.ibge_url.clone(),
            viacep_url: settings.viacep_url.clone(),
            ..Default::default()
        })
        .context("creating gazetteer clients")?;

        let store = SqliteDocumentStore::connect(&settings.database_url)
            .await
            .context("connecting document store")?;
        store.migrate().await.context("migrating document store")?;

        Ok(Self::from_parts(layers, Arc::new(model), Arc::new(gazetteer), Arc::new(store)))
    }
}

fn layer_source(settings: &Settings, pipeline: PipelineConfig) -> Result<Arc<dyn LayerSource>> {
    match settings.provider {
        ProviderKind::EarthEngine => {
            let key = ServiceAccountKey::from_env().context("reading Earth Engine service account")?;
            let project = key.project_id.clone();
            let mut config = EarthEngineConfig::new(project.clone());
            config.boundaries = pipeline.boundaries.clone();

            let credentials = ServiceAccount::new(key).context("loading service account key")?;
            let client = EarthEngineClient::new(config, Arc::new(credentials))?;
            info!(project = %project, "Using Earth Engine provider");
            Ok(Arc::new(LayerFetcher::new(client, pipeline)))
        }
        ProviderKind::Local => {
            let store_config = LocalStoreConfig {
                max_thumbnail_dimension: pipeline.thumbnail.max_dimension,
                ..Default::default()
            };
            let store = LocalRasterStore::load_dir(&settings.local_data_dir, store_config)
                .with_context(|| format!("loading local rasters from {}", settings.local_data_dir.display()))?;
            info!(dir = %settings.local_data_dir.display(), "Using local raster provider");
            Ok(Arc::new(LayerFetcher::new(store, pipeline)))
        }
    }
}
