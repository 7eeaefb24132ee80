//! Municipality statistics and postal-code lookups.
//!
//! Two public Brazilian services back the dashboard's city pages:
//! - IBGE localities and aggregates: administrative hierarchy, 2022 census
//!   population and territorial area
//! - ViaCEP: postal code (CEP) to municipality
//!
//! Both clients share one pooled [`reqwest::Client`].

pub mod ibge;
pub mod postal;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use heat_common::{CityProfile, HeatError, HeatResult, PostalAddress};

pub use ibge::{IbgeClient, IbgeMunicipality, DEFAULT_IBGE_URL};
pub use postal::{normalize_cep, PostalCodeClient, DEFAULT_VIACEP_URL};

/// Endpoints and HTTP settings for both services.
#[derive(Debug, Clone)]
pub struct GazetteerConfig {
    pub ibge_url: String,
    pub viacep_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for GazetteerConfig {
    fn default() -> Self {
        Self {
            ibge_url: DEFAULT_IBGE_URL.to_string(),
            viacep_url: DEFAULT_VIACEP_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Lookups the HTTP layer needs, behind one object-safe seam.
#[async_trait]
pub trait Gazetteer: Send + Sync {
    async fn city_profile(&self, municipality: &str) -> HeatResult<CityProfile>;

    async fn postal_code(&self, cep: &str) -> HeatResult<PostalAddress>;
}

/// [`Gazetteer`] backed by the live IBGE and ViaCEP APIs.
pub struct PublicGazetteer {
    ibge: IbgeClient,
    postal: PostalCodeClient,
}

impl PublicGazetteer {
    pub fn new(config: &GazetteerConfig) -> HeatResult<Self> {
        let client = http_client(config)?;
        Ok(Self {
            ibge: IbgeClient::with_client(client.clone(), &config.ibge_url)?,
            postal: PostalCodeClient::with_client(client, &config.viacep_url)?,
        })
    }

    pub fn ibge(&self) -> &IbgeClient {
        &self.ibge
    }
}

#[async_trait]
impl Gazetteer for PublicGazetteer {
    async fn city_profile(&self, municipality: &str) -> HeatResult<CityProfile> {
        self.ibge.city_profile(municipality).await
    }

    async fn postal_code(&self, cep: &str) -> HeatResult<PostalAddress> {
        self.postal.lookup(cep).await
    }
}

pub(crate) fn http_client(config: &GazetteerConfig) -> HeatResult<Client> {
    Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(4)
        .tcp_nodelay(true)
        .build()
        .map_err(|e| HeatError::Internal(format!("Failed to create HTTP client: {e}")))
}

/// Parse a base URL, append path segments (percent-encoded) to it.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> HeatResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| HeatError::Configuration(format!("Cannot use {base} as a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) fn parse_base(base: &str) -> HeatResult<Url> {
    Url::parse(base).map_err(|e| HeatError::Configuration(format!("Invalid base URL {base}: {e}")))
}
