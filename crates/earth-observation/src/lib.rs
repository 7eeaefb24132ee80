//! Satellite-derived layer acquisition for the urban-heat dashboard.
//!
//! Implements:
//! - The [`EarthObservation`] provider trait and its two backends: the Earth
//!   Engine REST client and an in-process [`LocalRasterStore`]
//! - OAuth credential providers for the REST client
//! - The [`LayerFetcher`] pipeline producing a four-layer [`LayerBundle`]
//!   (NDVI, land surface temperature, population, infrastructure) and a
//!   true-color city map
//! - YAML pipeline configuration
//!
//! [`LayerBundle`]: heat_common::LayerBundle

pub mod config;
pub mod credentials;
pub mod earth_engine;
pub mod fetcher;
pub mod local;
pub mod provider;
pub mod raster;

pub use config::PipelineConfig;
pub use credentials::{AccessToken, CredentialProvider, ServiceAccount, ServiceAccountKey, StaticToken};
pub use earth_engine::{EarthEngineClient, EarthEngineConfig};
pub use fetcher::{CityMap, LayerFetcher, LayerSource};
pub use local::{LocalRasterStore, LocalStoreConfig, Scene};
pub use provider::{CloudFilter, EarthObservation, ThumbnailSource};
pub use raster::{GridSpec, Raster};
