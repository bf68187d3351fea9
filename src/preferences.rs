use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

pub const DEFAULT_BUDGET: i64 = 1000;

/// Cuisine choices offered on the preference form. Serialized as the
/// Japanese label the analysis prompt and the UI both use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cuisine {
    #[default]
    #[serde(rename = "和食")]
    Japanese,
    #[serde(rename = "洋食")]
    Western,
    #[serde(rename = "中華")]
    Chinese,
    #[serde(rename = "おもてなし")]
    Omotenashi,
    #[serde(rename = "凝った料理")]
    Elaborate,
    #[serde(rename = "その他")]
    Other,
}

impl Cuisine {
    pub fn label(self) -> &'static str {
        match self {
            Cuisine::Japanese => "和食",
            Cuisine::Western => "洋食",
            Cuisine::Chinese => "中華",
            Cuisine::Omotenashi => "おもてなし",
            Cuisine::Elaborate => "凝った料理",
            Cuisine::Other => "その他",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// Yen. Signed so that a bad form value can still be represented and rejected.
    pub budget: i64,
    pub cuisine: Cuisine,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_cuisine: Option<String>,
    #[serde(default)]
    pub fridge_ingredients: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            cuisine: Cuisine::default(),
            custom_cuisine: None,
            fridge_ingredients: Vec::new(),
        }
    }
}

impl Preferences {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.budget <= 0 {
            return Err(ValidationError::InvalidBudget);
        }
        Ok(())
    }

    /// Label sent to the AI: the free-text override when "other" is picked
    /// and something was typed, the enumeration label otherwise.
    pub fn cuisine_label(&self) -> &str {
        match (self.cuisine, self.custom_cuisine.as_deref().map(str::trim)) {
            (Cuisine::Other, Some(custom)) if !custom.is_empty() => custom,
            (cuisine, _) => cuisine.label(),
        }
    }

    /// Adds a pantry ingredient. Blank input and duplicates are ignored.
    pub fn add_fridge_ingredient(&mut self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() || self.fridge_ingredients.iter().any(|i| i == trimmed) {
            return false;
        }
        self.fridge_ingredients.push(trimmed.to_string());
        true
    }

    pub fn remove_fridge_ingredient(&mut self, name: &str) -> bool {
        let before = self.fridge_ingredients.len();
        self.fridge_ingredients.retain(|i| i != name);
        before != self.fridge_ingredients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_form() {
        let p = Preferences::default();
        assert_eq!(p.budget, 1000);
        assert_eq!(p.cuisine, Cuisine::Japanese);
        assert!(p.fridge_ingredients.is_empty());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn non_positive_budget_is_rejected() {
        for budget in [0, -1, -1000] {
            let p = Preferences {
                budget,
                ..Preferences::default()
            };
            assert_eq!(p.validate(), Err(ValidationError::InvalidBudget));
        }
    }

    #[test]
    fn fridge_ingredients_are_trimmed_and_distinct() {
        let mut p = Preferences::default();
        assert!(p.add_fridge_ingredient(" 卵 "));
        assert!(!p.add_fridge_ingredient("卵"));
        assert!(!p.add_fridge_ingredient("   "));
        assert!(p.add_fridge_ingredient("牛乳"));
        assert_eq!(p.fridge_ingredients, vec!["卵", "牛乳"]);

        assert!(p.remove_fridge_ingredient("卵"));
        assert!(!p.remove_fridge_ingredient("卵"));
        assert_eq!(p.fridge_ingredients, vec!["牛乳"]);
    }

    #[test]
    fn custom_cuisine_only_applies_to_other() {
        let mut p = Preferences {
            cuisine: Cuisine::Other,
            custom_cuisine: Some("タイ料理".into()),
            ..Preferences::default()
        };
        assert_eq!(p.cuisine_label(), "タイ料理");

        p.custom_cuisine = Some("  ".into());
        assert_eq!(p.cuisine_label(), "その他");

        p.cuisine = Cuisine::Chinese;
        p.custom_cuisine = Some("タイ料理".into());
        assert_eq!(p.cuisine_label(), "中華");
    }

    #[test]
    fn serializes_with_japanese_labels() {
        let p = Preferences {
            budget: 1500,
            cuisine: Cuisine::Western,
            custom_cuisine: None,
            fridge_ingredients: vec!["卵".into()],
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["cuisine"], "洋食");
        assert_eq!(json["fridgeIngredients"][0], "卵");
        assert!(json.get("customCuisine").is_none());
    }
}
