//! Generative-AI prompt flows.
//!
//! A [`Flow`] turns a typed input into a [`PromptRequest`], hands it to any
//! [`PromptModel`] and parses the JSON answer back into a typed output.
//! [`GeminiClient`] is the production model.

pub mod flow;
pub mod flows;
pub mod gemini;
pub mod model;
pub mod template;

pub use flow::Flow;
pub use flows::{
    describe_city, diagnose_urban_heat_islands, generate_climate_plan, generate_planting_recommendations,
    CityDescription, ClimatePlanInput, ClimatePlanOutput, DiagnosisInput, DiagnosisOutput, PlantingInput,
    PlantingOutput, PriorityZone,
};
pub use gemini::{GeminiClient, GeminiConfig};
pub use model::{Part, PromptModel, PromptRequest};
