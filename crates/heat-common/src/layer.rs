//! Geospatial layer kinds and the four-layer bundle handed to the diagnosis flow.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{HeatError, HeatResult};

/// The four derived layers fetched for every municipality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Ndvi,
    Lst,
    PopulationDensity,
    Infrastructure,
}

impl LayerKind {
    pub const ALL: [LayerKind; 4] = [
        LayerKind::Ndvi,
        LayerKind::Lst,
        LayerKind::PopulationDensity,
        LayerKind::Infrastructure,
    ];

    /// Short label used in logs and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            LayerKind::Ndvi => "NDVI",
            LayerKind::Lst => "LST",
            LayerKind::PopulationDensity => "Population",
            LayerKind::Infrastructure => "Infrastructure",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LayerKind::Ndvi => "Vegetation cover (NDVI)",
            LayerKind::Lst => "Land surface temperature (°C)",
            LayerKind::PopulationDensity => "Population density (people per pixel)",
            LayerKind::Infrastructure => "Proximity to critical infrastructure",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Four embeddable PNG data URIs, one per [`LayerKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerBundle {
    pub ndvi_data_uri: String,
    pub lst_data_uri: String,
    pub population_density_data: String,
    pub infrastructure_data: String,
}

impl LayerBundle {
    /// Assemble a bundle from `(kind, data_uri)` pairs.
    ///
    /// Every kind must appear exactly once with a non-empty value.
    pub fn from_layers<I>(layers: I) -> HeatResult<Self>
    where
        I: IntoIterator<Item = (LayerKind, String)>,
    {
        let mut slots: [Option<String>; 4] = Default::default();
        for (kind, uri) in layers {
            if uri.is_empty() {
                return Err(HeatError::InvalidImage(format!("{kind} layer is empty")));
            }
            let slot = &mut slots[Self::slot(kind)];
            if slot.is_some() {
                return Err(HeatError::Internal(format!("{kind} layer supplied twice")));
            }
            *slot = Some(uri);
        }

        let [ndvi, lst, population, infrastructure] = slots;
        let missing = |kind: LayerKind| HeatError::Internal(format!("{kind} layer missing from bundle"));
        Ok(Self {
            ndvi_data_uri: ndvi.ok_or_else(|| missing(LayerKind::Ndvi))?,
            lst_data_uri: lst.ok_or_else(|| missing(LayerKind::Lst))?,
            population_density_data: population.ok_or_else(|| missing(LayerKind::PopulationDensity))?,
            infrastructure_data: infrastructure.ok_or_else(|| missing(LayerKind::Infrastructure))?,
        })
    }

    pub fn get(&self, kind: LayerKind) -> &str {
        match kind {
            LayerKind::Ndvi => &self.ndvi_data_uri,
            LayerKind::Lst => &self.lst_data_uri,
            LayerKind::PopulationDensity => &self.population_density_data,
            LayerKind::Infrastructure => &self.infrastructure_data,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (LayerKind, &str)> {
        LayerKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    fn slot(kind: LayerKind) -> usize {
        match kind {
            LayerKind::Ndvi => 0,
            LayerKind::Lst => 1,
            LayerKind::PopulationDensity => 2,
            LayerKind::Infrastructure => 3,
        }
    }
}
