pub mod saved;

use serde::{Deserialize, Serialize};

pub use saved::{SavedRecipe, SavedRecipeStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub name: String,
    pub quantity: String,
    pub is_discounted: bool,
}

/// Per-serving estimate. Calories in kcal, the rest in grams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
}

/// Percent of a per-meal reference amount, capped at 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NutritionShare {
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
}

impl Nutrition {
    const PROTEIN_REF_G: f64 = 60.0;
    const FAT_REF_G: f64 = 60.0;
    const CARBS_REF_G: f64 = 300.0;
    const FIBER_REF_G: f64 = 20.0;

    pub fn is_valid(&self) -> bool {
        [self.calories, self.protein, self.fat, self.carbs, self.fiber]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }

    pub fn share(&self) -> NutritionShare {
        let pct = |value: f64, reference: f64| (value / reference * 100.0).min(100.0);
        NutritionShare {
            protein: pct(self.protein, Self::PROTEIN_REF_G),
            fat: pct(self.fat, Self::FAT_REF_G),
            carbs: pct(self.carbs, Self::CARBS_REF_G),
            fiber: pct(self.fiber, Self::FIBER_REF_G),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub description: String,
    pub cooking_time_minutes: u32,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub estimated_cost: u32,
    pub savings_note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
}

impl Recipe {
    /// Discounted ingredients, in recipe order.
    pub fn discounted_ingredients(&self) -> impl Iterator<Item = &Ingredient> {
        self.ingredients.iter().filter(|i| i.is_discounted)
    }
}
