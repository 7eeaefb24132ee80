//! The dashboard's four prompt flows.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use heat_common::{CityProfile, HeatResult, LayerBundle};

use crate::flow::Flow;
use crate::model::PromptModel;

// === Heat-island diagnosis ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisInput {
    pub municipality_description: String,
    pub ndvi_data_uri: String,
    pub lst_data_uri: String,
    pub population_density_data: String,
    pub infrastructure_data: String,
}

impl DiagnosisInput {
    pub fn new(municipality_description: impl Into<String>, layers: LayerBundle) -> Self {
        Self {
            municipality_description: municipality_description.into(),
            ndvi_data_uri: layers.ndvi_data_uri,
            lst_data_uri: layers.lst_data_uri,
            population_density_data: layers.population_density_data,
            infrastructure_data: layers.infrastructure_data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityZone {
    pub location: String,
    /// high, medium or low
    pub heat_risk_level: String,
    pub social_vulnerability: String,
    pub recommended_intervention: String,
    pub estimated_impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisOutput {
    pub summary: String,
    /// Highest heat risk first.
    pub priority_zones: Vec<PriorityZone>,
    pub suggested_actions: String,
}

const DIAGNOSIS_PROMPT: &str = "You are an expert in urban heat island analysis and green intervention planning. \
Analyze the urban heat islands of the municipality below and identify the areas where green interventions are most needed. \
Provide a summary of the analysis, a list of priority zones and recommended actions for the city manager.

Municipality Description: {{municipalityDescription}}

Vegetation Cover (NDVI, -1 bare soil or water to +1 dense vegetation): {{media url=ndviDataUri}}

Land Surface Temperature (LST): {{media url=lstDataUri}}

Population Density (people per square kilometer): {{media url=populationDensityData}}

Proximity to Critical Infrastructure (schools and hospitals): {{media url=infrastructureData}}

Sort priority zones by heat risk level (high, medium, low). High heat risk means high surface temperature and low vegetation. \
High social vulnerability means high population density close to critical infrastructure.
Give detailed intervention suggestions, including planting density and suggested species, \
and estimate the temperature reduction and the number of people benefited.
";

fn diagnosis_schema() -> Value {
    let zone = object_schema(&[
        ("location", string_schema()),
        ("heatRiskLevel", json!({ "type": "STRING", "enum": ["high", "medium", "low"] })),
        ("socialVulnerability", json!({ "type": "STRING", "enum": ["high", "medium", "low"] })),
        ("recommendedIntervention", string_schema()),
        ("estimatedImpact", string_schema()),
    ]);
    object_schema(&[
        ("summary", string_schema()),
        ("priorityZones", json!({ "type": "ARRAY", "items": zone })),
        ("suggestedActions", string_schema()),
    ])
}

pub const DIAGNOSE_URBAN_HEAT_ISLANDS: Flow<DiagnosisInput, DiagnosisOutput> =
    Flow::new("diagnoseUrbanHeatIslands", DIAGNOSIS_PROMPT, diagnosis_schema);

/// Diagnose heat islands from the four layer images.
pub async fn diagnose_urban_heat_islands(model: &dyn PromptModel, input: &DiagnosisInput) -> HeatResult<DiagnosisOutput> {
    DIAGNOSE_URBAN_HEAT_ISLANDS.run(model, input).await
}

// === Planting recommendations ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantingInput {
    pub area_description: String,
    pub environmental_conditions: String,
    pub desired_outcomes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantingOutput {
    pub recommended_species: Vec<String>,
    pub planting_strategy: String,
    pub estimated_impact: String,
}

const PLANTING_PROMPT: &str = "You are an expert urban planner specializing in planting recommendations.

Area Description: {{areaDescription}}
Environmental Conditions: {{environmentalConditions}}
Desired Outcomes: {{desiredOutcomes}}

Take into account native species, adaptation to the local climate, soil type, sunlight exposure, \
water availability and maintenance requirements.

Provide a list of recommended plant species, a planting strategy (spacing, layout and maintenance) \
and an estimate of the environmental impact of the planting.
";

fn planting_schema() -> Value {
    object_schema(&[
        ("recommendedSpecies", json!({ "type": "ARRAY", "items": string_schema() })),
        ("plantingStrategy", string_schema()),
        ("estimatedImpact", string_schema()),
    ])
}

pub const GENERATE_PLANTING_RECOMMENDATIONS: Flow<PlantingInput, PlantingOutput> =
    Flow::new("generatePlantingRecommendations", PLANTING_PROMPT, planting_schema);

pub async fn generate_planting_recommendations(model: &dyn PromptModel, input: &PlantingInput) -> HeatResult<PlantingOutput> {
    GENERATE_PLANTING_RECOMMENDATIONS.run(model, input).await
}

// === Climate plan ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimatePlanInput {
    pub municipality_name: String,
    pub problem_description: String,
    pub suggested_areas: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimatePlanOutput {
    pub climate_plan: String,
    pub supporting_documentation: String,
}

const CLIMATE_PLAN_PROMPT: &str = "You are an expert climate planner. \
Generate a climate plan for the municipality of {{municipalityName}}.

The problem is: {{problemDescription}}

Suggested areas for green intervention: {{suggestedAreas}}

Include supporting documentation.
";

fn climate_plan_schema() -> Value {
    object_schema(&[
        ("climatePlan", string_schema()),
        ("supportingDocumentation", string_schema()),
    ])
}

pub const GENERATE_CLIMATE_PLAN: Flow<ClimatePlanInput, ClimatePlanOutput> =
    Flow::new("generateClimatePlan", CLIMATE_PLAN_PROMPT, climate_plan_schema);

pub async fn generate_climate_plan(model: &dyn PromptModel, input: &ClimatePlanInput) -> HeatResult<ClimatePlanOutput> {
    GENERATE_CLIMATE_PLAN.run(model, input).await
}

// === City description ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityDescription {
    pub description: String,
}

const CITY_DESCRIPTION_PROMPT: &str = "You are an expert urban planner assistant. \
Based on the following IBGE data for a Brazilian municipality, write a concise description in Portuguese \
for a climate planning context. Focus on location, biome, population and area, in 2-3 sentences.

IBGE Data:
- Nome: {{name}}
- Microrregião: {{microRegion}}
- Mesorregião: {{mesoRegion}}
- UF: {{state}}
- Região: {{region}} (use the region's predominant biome unless more specific information is known)
- População (Censo 2022): {{population}}
- Área Territorial (km²): {{area}}
";

fn city_description_schema() -> Value {
    object_schema(&[("description", string_schema())])
}

pub const DESCRIBE_CITY: Flow<CityProfile, CityDescription> =
    Flow::new("describeCity", CITY_DESCRIPTION_PROMPT, city_description_schema);

pub async fn describe_city(model: &dyn PromptModel, profile: &CityProfile) -> HeatResult<CityDescription> {
    DESCRIBE_CITY.run(model, profile).await
}

// === Schema helpers (Gemini's OpenAPI subset) ===

fn string_schema() -> Value {
    json!({ "type": "STRING" })
}

fn object_schema(fields: &[(&str, Value)]) -> Value {
    let properties: serde_json::Map<String, Value> =
        fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
    let required: Vec<&str> = fields.iter().map(|(k, _)| *k).collect();
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
        "propertyOrdering": required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Part;

    fn layers() -> LayerBundle {
        LayerBundle {
            ndvi_data_uri: "data:image/png;base64,TkRWSQ==".into(),
            lst_data_uri: "data:image/png;base64,TFNU".into(),
            population_density_data: "data:image/png;base64,UE9Q".into(),
            infrastructure_data: "data:image/png;base64,SU5GUkE=".into(),
        }
    }

    #[test]
    fn test_diagnosis_prompt_orders_media() {
        let input = DiagnosisInput::new("Coastal city, dense centre", layers());
        let request = DIAGNOSE_URBAN_HEAT_ISLANDS.prompt(&input).unwrap();

        let media: Vec<&str> = request.media().collect();
        assert_eq!(
            media,
            vec![
                "data:image/png;base64,TkRWSQ==",
                "data:image/png;base64,TFNU",
                "data:image/png;base64,UE9Q",
                "data:image/png;base64,SU5GUkE=",
            ]
        );
        assert!(matches!(&request.parts[0], Part::Text(t) if t.contains("Coastal city, dense centre")));
        assert!(!request.text().contains("data:image"));
        assert_eq!(request.output_schema["required"], json!(["summary", "priorityZones", "suggestedActions"]));
    }

    #[test]
    fn test_city_prompt_uses_profile_fields() {
        let profile = CityProfile {
            ibge_id: 3509502,
            name: "Campinas".into(),
            micro_region: "Campinas".into(),
            meso_region: "Campinas".into(),
            state: "SP".into(),
            region: "Sudeste".into(),
            population: "1139047".into(),
            area: "794.571".into(),
        };
        let text = DESCRIBE_CITY.prompt(&profile).unwrap().text();
        assert!(text.contains("- UF: SP"));
        assert!(text.contains("- População (Censo 2022): 1139047"));
        assert!(text.contains("- Área Territorial (km²): 794.571"));
    }

    #[test]
    fn test_plan_prompt_has_no_media() {
        let input = ClimatePlanInput {
            municipality_name: "Campinas".into(),
            problem_description: "Heat waves".into(),
            suggested_areas: "Centro".into(),
        };
        let request = GENERATE_CLIMATE_PLAN.prompt(&input).unwrap();
        assert_eq!(request.parts.len(), 1);
        assert!(request.text().contains("municipality of Campinas."));
    }
}
