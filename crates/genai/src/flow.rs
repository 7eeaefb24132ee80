//! Typed prompt flows.

use std::fmt;
use std::marker::PhantomData;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use heat_common::{HeatError, HeatResult};

use crate::model::{PromptModel, PromptRequest};
use crate::template;

/// A named prompt template with a typed input and output.
pub struct Flow<I, O> {
    name: &'static str,
    template: &'static str,
    output_schema: fn() -> Value,
    _types: PhantomData<fn(&I) -> O>,
}

impl<I, O> Flow<I, O>
where
    I: Serialize,
    O: DeserializeOwned,
{
    pub const fn new(name: &'static str, template: &'static str, output_schema: fn() -> Value) -> Self {
        Self {
            name,
            template,
            output_schema,
            _types: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Render the template against the serialized input.
    pub fn prompt(&self, input: &I) -> HeatResult<PromptRequest> {
        let vars = serde_json::to_value(input)
            .map_err(|e| HeatError::Internal(format!("Cannot serialize {} input: {e}", self.name)))?;
        Ok(PromptRequest {
            name: self.name.to_string(),
            parts: template::render(self.template, &vars),
            output_schema: (self.output_schema)(),
        })
    }

    /// Run the flow once against `model`.
    pub async fn run(&self, model: &dyn PromptModel, input: &I) -> HeatResult<O> {
        let start = Instant::now();
        let result = self.generate(model, input).await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("flow_requests_total", "flow" => self.name, "outcome" => outcome).increment(1);

        match &result {
            Ok(_) => info!(flow = self.name, elapsed_ms = start.elapsed().as_millis() as u64, "Flow completed"),
            Err(e) => error!(flow = self.name, error = %e, "Flow failed"),
        }
        result
    }

    async fn generate(&self, model: &dyn PromptModel, input: &I) -> HeatResult<O> {
        let request = self.prompt(input)?;
        debug!(flow = self.name, parts = request.parts.len(), "Sending prompt");

        let output = model.generate(request).await?;
        serde_json::from_value(output).map_err(|e| HeatError::InvalidModelOutput {
            flow: self.name.to_string(),
            message: e.to_string(),
        })
    }
}

impl<I, O> fmt::Debug for Flow<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow").field("name", &self.name).finish()
    }
}
