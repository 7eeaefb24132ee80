//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use heat_common::{HeatError, HeatResult};

use crate::model::{Part, PromptModel, PromptRequest};

const SERVICE: &str = "Gemini";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> HeatResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(HeatError::Configuration("Gemini API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| HeatError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Translate a prompt into a `generateContent` body.
pub fn request_body(request: &PromptRequest) -> HeatResult<Value> {
    let parts = request
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => Ok(json!({ "text": text })),
            Part::Media(uri) => {
                let (mime_type, data) = split_data_uri(uri)?;
                Ok(json!({ "inline_data": { "mime_type": mime_type, "data": data } }))
            }
        })
        .collect::<HeatResult<Vec<_>>>()?;

    Ok(json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": request.output_schema,
        },
    }))
}

/// `data:<mime>;base64,<payload>` into its mime type and payload, undecoded.
fn split_data_uri(uri: &str) -> HeatResult<(&str, &str)> {
    uri.strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .filter(|(mime, data)| !mime.is_empty() && !data.is_empty())
        .ok_or_else(|| HeatError::InvalidImage("media part is not a base64 data URI".to_string()))
}

/// The JSON answer inside the first candidate.
fn candidate_json(flow: &str, body: &Value) -> HeatResult<Value> {
    let text = body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| {
            let reason = body["candidates"][0]["finishReason"]
                .as_str()
                .or_else(|| body["promptFeedback"]["blockReason"].as_str())
                .unwrap_or("no candidates");
            HeatError::upstream(SERVICE, None, format!("Empty response: {reason}"))
        })?;

    serde_json::from_str(text).map_err(|e| HeatError::InvalidModelOutput {
        flow: flow.to_string(),
        message: format!("not JSON: {e}"),
    })
}

#[async_trait]
impl PromptModel for GeminiClient {
    #[instrument(skip(self, request), fields(prompt = %request.name, model = %self.config.model))]
    async fn generate(&self, request: PromptRequest) -> HeatResult<Value> {
        let body = request_body(&request)?;

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| HeatError::upstream(SERVICE, None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            warn!(status = status.as_u16(), message = %message, "Gemini request failed");
            return Err(HeatError::upstream(SERVICE, Some(status.as_u16()), message));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| HeatError::upstream(SERVICE, None, format!("Malformed response: {e}")))?;
        debug!("Received model answer");
        candidate_json(&request.name, &body)
    }
}
