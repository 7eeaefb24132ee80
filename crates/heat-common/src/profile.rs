//! Municipality profile assembled from government statistics.

use serde::{Deserialize, Serialize};

/// Placeholder used when a statistic cannot be retrieved.
pub const UNAVAILABLE: &str = "não disponível";

/// Administrative hierarchy plus headline statistics for one municipality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityProfile {
    pub ibge_id: u64,
    pub name: String,
    pub micro_region: String,
    pub meso_region: String,
    /// Two-letter state code (UF).
    pub state: String,
    pub region: String,
    /// 2022 census population, or [`UNAVAILABLE`].
    pub population: String,
    /// Territorial area in km², or [`UNAVAILABLE`].
    pub area: String,
}

impl CityProfile {
    pub fn has_statistics(&self) -> bool {
        self.population != UNAVAILABLE && self.area != UNAVAILABLE
    }
}

/// A postal-code (CEP) lookup result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    pub cep: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub neighborhood: String,
    pub locality: String,
    pub state: String,
    #[serde(default)]
    pub ibge_id: Option<String>,
}

impl PostalAddress {
    /// `"Campinas - SP"`, the label the dashboard uses for municipalities.
    pub fn municipality_label(&self) -> String {
        format!("{} - {}", self.locality, self.state)
    }
}
