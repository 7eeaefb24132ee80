//! Action request payloads and their field checks.
//!
//! Every field is optional at the JSON level so that a missing field is
//! reported the same way as an empty one.

use serde::Deserialize;

use genai::{ClimatePlanInput, PlantingInput};
use heat_common::{FieldError, HeatError, HeatResult};

fn require(errors: &mut Vec<FieldError>, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, message));
    }
}

fn finish(errors: Vec<FieldError>) -> HeatResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(HeatError::Validation(errors))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagnosticsRequest {
    pub municipality_description: String,
    pub municipality_name: String,
}

impl DiagnosticsRequest {
    pub fn validate(&self) -> HeatResult<()> {
        let mut errors = Vec::new();
        require(
            &mut errors,
            "municipalityDescription",
            &self.municipality_description,
            "Municipality description is required.",
        );
        require(
            &mut errors,
            "municipalityName",
            &self.municipality_name,
            "Municipality name is required.",
        );
        finish(errors)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendationsRequest {
    pub area_description: String,
    pub environmental_conditions: String,
    pub desired_outcomes: String,
}

impl RecommendationsRequest {
    pub fn into_input(self) -> HeatResult<PlantingInput> {
        let mut errors = Vec::new();
        require(&mut errors, "areaDescription", &self.area_description, "Area description is required.");
        require(
            &mut errors,
            "environmentalConditions",
            &self.environmental_conditions,
            "Environmental conditions are required.",
        );
        require(&mut errors, "desiredOutcomes", &self.desired_outcomes, "Desired outcomes are required.");
        finish(errors)?;

        Ok(PlantingInput {
            area_description: self.area_description.trim().to_string(),
            environmental_conditions: self.environmental_conditions.trim().to_string(),
            desired_outcomes: self.desired_outcomes.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanRequest {
    pub municipality_name: String,
    pub problem_description: String,
    pub suggested_areas: String,
}

impl PlanRequest {
    pub fn into_input(self) -> HeatResult<ClimatePlanInput> {
        let mut errors = Vec::new();
        require(&mut errors, "municipalityName", &self.municipality_name, "Municipality name is required.");
        require(
            &mut errors,
            "problemDescription",
            &self.problem_description,
            "Problem description is required.",
        );
        require(&mut errors, "suggestedAreas", &self.suggested_areas, "Suggested areas are required.");
        finish(errors)?;

        Ok(ClimatePlanInput {
            municipality_name: self.municipality_name.trim().to_string(),
            problem_description: self.problem_description.trim().to_string(),
            suggested_areas: self.suggested_areas.trim().to_string(),
        })
    }
}
