//! IBGE localities and aggregates API client.

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use heat_common::{CityProfile, HeatError, HeatResult, Municipality, UNAVAILABLE};

use crate::{endpoint, http_client, parse_base, GazetteerConfig};

const SERVICE: &str = "IBGE";
pub const DEFAULT_IBGE_URL: &str = "https://servicodados.ibge.gov.br";

/// Census period every statistic is read from.
const PERIOD: &str = "2022";

/// Aggregate 6579 (population estimates), variable 9324 (resident population).
const POPULATION: (&str, &str) = ("6579", "9324");
/// Aggregate 1301 (territorial area), variable 615 (area in km²).
const AREA: (&str, &str) = ("1301", "615");

/// A municipality as returned by `/api/v1/localidades/municipios`.
///
/// Newly created municipalities can come back without a micro-region, so the
/// hierarchy is optional all the way down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IbgeMunicipality {
    pub id: u64,
    pub nome: String,
    #[serde(default)]
    pub microrregiao: Option<MicroRegion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicroRegion {
    pub nome: String,
    #[serde(default)]
    pub mesorregiao: Option<MesoRegion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MesoRegion {
    pub nome: String,
    #[serde(rename = "UF", default)]
    pub uf: Option<FederativeUnit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederativeUnit {
    pub sigla: String,
    pub nome: String,
    #[serde(default)]
    pub regiao: Option<Region>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub nome: String,
}

impl IbgeMunicipality {
    fn meso_region(&self) -> Option<&MesoRegion> {
        self.microrregiao.as_ref()?.mesorregiao.as_ref()
    }

    fn federative_unit(&self) -> Option<&FederativeUnit> {
        self.meso_region()?.uf.as_ref()
    }

    /// Assemble a profile from this record and the two statistics.
    pub fn profile(&self, population: String, area: String) -> CityProfile {
        let or_unavailable = |s: Option<&str>| s.unwrap_or(UNAVAILABLE).to_string();
        let uf = self.federative_unit();

        CityProfile {
            ibge_id: self.id,
            name: self.nome.clone(),
            micro_region: or_unavailable(self.microrregiao.as_ref().map(|m| m.nome.as_str())),
            meso_region: or_unavailable(self.meso_region().map(|m| m.nome.as_str())),
            state: or_unavailable(uf.map(|u| u.sigla.as_str())),
            region: or_unavailable(uf.and_then(|u| u.regiao.as_ref()).map(|r| r.nome.as_str())),
            population,
            area,
        }
    }
}

pub struct IbgeClient {
    client: Client,
    base_url: Url,
}

impl IbgeClient {
    pub fn new(base_url: &str) -> HeatResult<Self> {
        Self::with_client(http_client(&GazetteerConfig::default())?, base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> HeatResult<Self> {
        Ok(Self {
            client,
            base_url: parse_base(base_url)?,
        })
    }

    async fn get_json(&self, url: Url) -> HeatResult<(StatusCode, Option<Value>)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HeatError::upstream(SERVICE, None, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Ok((status, None));
        }
        let body = response
            .json()
            .await
            .map_err(|e| HeatError::upstream(SERVICE, Some(status.as_u16()), format!("Malformed response: {e}")))?;
        Ok((status, Some(body)))
    }

    /// Look a municipality up by name.
    ///
    /// A `" - UF"` suffix is ignored. The direct lookup only understands
    /// numeric ids, so when it comes back empty the full list is scanned for
    /// a case-insensitive name match.
    #[instrument(skip(self))]
    pub async fn find_municipality(&self, label: &str) -> HeatResult<IbgeMunicipality> {
        let name = Municipality::parse(label)?.name;

        let url = endpoint(&self.base_url, &["api", "v1", "localidades", "municipios", &name])?;
        let (status, body) = self.get_json(url).await?;
        if let Some(found) = body.and_then(single_municipality) {
            debug!(id = found.id, "Direct municipality lookup");
            return Ok(found);
        }
        debug!(status = status.as_u16(), "Direct lookup missed, scanning municipality list");

        let url = endpoint(&self.base_url, &["api", "v1", "localidades", "municipios"])?;
        let (status, body) = self.get_json(url).await?;
        let list: Vec<IbgeMunicipality> = match body {
            Some(body) => serde_json::from_value(body)
                .map_err(|e| HeatError::upstream(SERVICE, None, format!("Malformed municipality list: {e}")))?,
            None => {
                warn!(status = status.as_u16(), "Municipality list unavailable");
                return Err(HeatError::upstream(
                    SERVICE,
                    Some(status.as_u16()),
                    format!("Failed to fetch city data from IBGE for {name}"),
                ));
            }
        };

        let wanted = name.to_lowercase();
        let id = list
            .iter()
            .find(|m| m.nome.to_lowercase() == wanted)
            .map(|m| m.id)
            .ok_or_else(|| HeatError::MunicipalityNotFound(name.clone()))?;

        let url = endpoint(&self.base_url, &["api", "v1", "localidades", "municipios", &id.to_string()])?;
        let (status, body) = self.get_json(url).await?;
        body.and_then(single_municipality).ok_or_else(|| {
            HeatError::upstream(
                SERVICE,
                Some(status.as_u16()),
                format!("Failed to fetch city data from IBGE for {name}"),
            )
        })
    }

    /// 2022 resident population, or `"não disponível"`.
    pub async fn population(&self, id: u64) -> String {
        self.statistic(POPULATION, id).await
    }

    /// Territorial area in km², or `"não disponível"`.
    pub async fn area(&self, id: u64) -> String {
        self.statistic(AREA, id).await
    }

    async fn statistic(&self, (aggregate, variable): (&str, &str), id: u64) -> String {
        match self.fetch_statistic(aggregate, variable, id).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(aggregate, variable, id, "Statistic missing from response");
                UNAVAILABLE.to_string()
            }
            Err(e) => {
                warn!(aggregate, variable, id, error = %e, "Statistic lookup failed");
                UNAVAILABLE.to_string()
            }
        }
    }

    async fn fetch_statistic(&self, aggregate: &str, variable: &str, id: u64) -> HeatResult<Option<String>> {
        let mut url = endpoint(
            &self.base_url,
            &["api", "v3", "agregados", aggregate, "periodos", PERIOD, "variaveis", variable],
        )?;
        url.query_pairs_mut().append_pair("localidades", &format!("N6[{id}]"));

        let (_, body) = self.get_json(url).await?;
        Ok(body.as_ref().and_then(series_value))
    }

    /// Municipality details plus population and area.
    #[instrument(skip(self))]
    pub async fn city_profile(&self, label: &str) -> HeatResult<CityProfile> {
        let municipality = self.find_municipality(label).await?;
        let (population, area) = tokio::join!(self.population(municipality.id), self.area(municipality.id));

        info!(id = municipality.id, name = %municipality.nome, "Built city profile");
        Ok(municipality.profile(population, area))
    }
}

/// The direct lookup answers with an object for ids and an array otherwise.
fn single_municipality(body: Value) -> Option<IbgeMunicipality> {
    let value = match body {
        Value::Array(items) => items.into_iter().next()?,
        value @ Value::Object(_) => value,
        _ => return None,
    };
    serde_json::from_value(value).ok()
}

fn series_value(body: &Value) -> Option<String> {
    let value = &body[0]["resultados"][0]["series"][0]["serie"][PERIOD];
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
