//! ViaCEP postal-code client.

use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use heat_common::{HeatError, HeatResult, PostalAddress};

use crate::{endpoint, http_client, parse_base, GazetteerConfig};

const SERVICE: &str = "ViaCEP";
pub const DEFAULT_VIACEP_URL: &str = "https://viacep.com.br";

/// Strip punctuation from a CEP and require exactly eight digits.
pub fn normalize_cep(cep: &str) -> HeatResult<String> {
    let digits: String = cep.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 8 {
        return Err(HeatError::invalid("cep", "Postal code must have 8 digits."));
    }
    Ok(digits)
}

#[derive(Debug, Deserialize)]
struct ViaCepAddress {
    cep: String,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    localidade: String,
    uf: String,
    #[serde(default)]
    ibge: Option<String>,
}

impl From<ViaCepAddress> for PostalAddress {
    fn from(a: ViaCepAddress) -> Self {
        PostalAddress {
            cep: a.cep,
            street: a.logradouro,
            neighborhood: a.bairro,
            locality: a.localidade,
            state: a.uf,
            ibge_id: a.ibge.filter(|id| !id.is_empty()),
        }
    }
}

pub struct PostalCodeClient {
    client: Client,
    base_url: Url,
}

impl PostalCodeClient {
    pub fn new(base_url: &str) -> HeatResult<Self> {
        Self::with_client(http_client(&GazetteerConfig::default())?, base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> HeatResult<Self> {
        Ok(Self {
            client,
            base_url: parse_base(base_url)?,
        })
    }

    /// Resolve a CEP to its address. Malformed codes never reach the network.
    #[instrument(skip(self))]
    pub async fn lookup(&self, cep: &str) -> HeatResult<PostalAddress> {
        let cep = normalize_cep(cep)?;
        let url = endpoint(&self.base_url, &["ws", &cep, "json", ""])?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HeatError::upstream(SERVICE, None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Postal code lookup failed");
            return Err(HeatError::upstream(SERVICE, Some(status.as_u16()), "Postal code lookup failed"));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| HeatError::upstream(SERVICE, None, format!("Malformed response: {e}")))?;

        // Unknown codes come back as 200 with an error flag, sometimes quoted.
        if matches!(body.get("erro"), Some(Value::Bool(true))) || body.get("erro").and_then(Value::as_str) == Some("true")
        {
            return Err(HeatError::PostalCodeNotFound(cep));
        }

        let address: ViaCepAddress = serde_json::from_value(body)
            .map_err(|e| HeatError::upstream(SERVICE, None, format!("Malformed address: {e}")))?;
        info!(locality = %address.localidade, uf = %address.uf, "Resolved postal code");
        Ok(address.into())
    }
}
