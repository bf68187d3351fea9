use serde::{Deserialize, Serialize};

use crate::recipes::{Ingredient, Nutrition, Recipe};

/// Typed outcome of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub is_flyer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joke: Option<String>,
    #[serde(default)]
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub detected_deals: Vec<String>,
}

// ---- Gemini generateContent wire types ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Part {
    InlineData { inline_data: InlineData },
    Text { text: String },
}

#[derive(Debug, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: &'static str,
    pub response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

/// Only text parts matter here; anything else deserializes with `text: None`.
#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate's first text part.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|p| p.text.as_deref())
    }
}

// ---- shape the model is asked to answer with ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelAnswer {
    pub is_flyer: bool,
    pub joke: Option<String>,
    pub recipes: Option<Vec<ModelRecipe>>,
    pub detected_deals: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRecipe {
    pub title: String,
    pub description: String,
    pub cooking_time_minutes: i64,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub estimated_cost: i64,
    pub savings_note: String,
    pub nutrition: Option<Nutrition>,
}

impl ModelRecipe {
    pub fn into_recipe(self, id: String) -> Result<Recipe, String> {
        let cooking_time_minutes = u32::try_from(self.cooking_time_minutes)
            .ok()
            .filter(|m| *m > 0)
            .ok_or_else(|| format!("cookingTimeMinutes must be positive, got {}", self.cooking_time_minutes))?;
        let estimated_cost = u32::try_from(self.estimated_cost)
            .map_err(|_| format!("estimatedCost must be non-negative, got {}", self.estimated_cost))?;
        if let Some(n) = &self.nutrition {
            if !n.is_valid() {
                return Err(format!("nutrition values must be non-negative in \"{}\"", self.title));
            }
        }
        Ok(Recipe {
            id,
            title: self.title,
            description: self.description,
            cooking_time_minutes,
            ingredients: self.ingredients,
            instructions: self.instructions,
            estimated_cost,
            savings_note: self.savings_note,
            nutrition: self.nutrition,
        })
    }
}

/// JSON schema passed as `responseSchema` so the model answers in [`ModelAnswer`] shape.
pub fn response_schema() -> serde_json::Value {
    let number = serde_json::json!({ "type": "NUMBER" });
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "isFlyer": { "type": "BOOLEAN" },
            "joke": { "type": "STRING" },
            "detectedDeals": { "type": "ARRAY", "items": { "type": "STRING" } },
            "recipes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "cookingTimeMinutes": { "type": "INTEGER" },
                        "ingredients": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "name": { "type": "STRING" },
                                    "quantity": { "type": "STRING" },
                                    "isDiscounted": { "type": "BOOLEAN" }
                                },
                                "required": ["name", "quantity", "isDiscounted"]
                            }
                        },
                        "instructions": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "estimatedCost": { "type": "INTEGER" },
                        "savingsNote": { "type": "STRING" },
                        "nutrition": {
                            "type": "OBJECT",
                            "properties": {
                                "calories": number.clone(),
                                "protein": number.clone(),
                                "fat": number.clone(),
                                "carbs": number.clone(),
                                "fiber": number
                            },
                            "required": ["calories", "protein", "fat", "carbs", "fiber"]
                        }
                    },
                    "required": [
                        "title", "description", "cookingTimeMinutes", "ingredients",
                        "instructions", "estimatedCost", "savingsNote"
                    ]
                }
            }
        },
        "required": ["isFlyer"]
    })
}
