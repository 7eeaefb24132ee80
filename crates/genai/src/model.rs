//! The model seam.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use heat_common::HeatResult;

/// One piece of a prompt, in the order the model should see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    /// A `data:<mime>;base64,<payload>` URI.
    Media(String),
}

/// A fully rendered prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    /// Prompt name, used for logs and metrics.
    pub name: String,
    pub parts: Vec<Part>,
    /// JSON schema the answer must follow.
    pub output_schema: Value,
}

impl PromptRequest {
    /// All text parts joined, media omitted.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Media(_) => None,
            })
            .collect()
    }

    pub fn media(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            Part::Media(uri) => Some(uri.as_str()),
            Part::Text(_) => None,
        })
    }
}

/// A generative model that answers a prompt with a JSON value.
#[async_trait]
pub trait PromptModel: Send + Sync {
    async fn generate(&self, request: PromptRequest) -> HeatResult<Value>;
}
