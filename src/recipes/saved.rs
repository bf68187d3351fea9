use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::Recipe;
use crate::errors::LocalStoreError;

pub const SLOT_FILE_NAME: &str = "flyerchef_saved_recipes.json";

/// A bookmarked recipe together with the deals that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecipe {
    #[serde(flatten)]
    pub recipe: Recipe,
    #[serde(with = "time::serde::rfc3339")]
    pub saved_at: OffsetDateTime,
    pub flyer_deals: Vec<String>,
}

/// Bookmarked recipes, most recent first, flushed to a JSON file on every change.
#[derive(Debug)]
pub struct SavedRecipeStore {
    path: PathBuf,
    recipes: Vec<SavedRecipe>,
}

impl SavedRecipeStore {
    /// Opens the slot under `data_dir`. A missing or unreadable slot yields an empty store.
    pub fn open(data_dir: impl AsRef<Path>) -> Self {
        let path = data_dir.as_ref().join(SLOT_FILE_NAME);
        let recipes = load_slot(&path);
        debug!(path = %path.display(), count = recipes.len(), "saved recipes loaded");
        Self { path, recipes }
    }

    /// Bookmarks `recipe`. Returns `false` when the id was already saved.
    pub fn save(&mut self, recipe: &Recipe, flyer_deals: &[String]) -> Result<bool, LocalStoreError> {
        if self.is_saved(&recipe.id) {
            return Ok(false);
        }
        self.recipes.insert(
            0,
            SavedRecipe {
                recipe: recipe.clone(),
                saved_at: OffsetDateTime::now_utc(),
                flyer_deals: flyer_deals.to_vec(),
            },
        );
        if let Err(e) = self.flush() {
            self.recipes.remove(0);
            return Err(e);
        }
        info!(recipe_id = %recipe.id, title = %recipe.title, "recipe saved");
        Ok(true)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, LocalStoreError> {
        let Some(index) = self.recipes.iter().position(|r| r.recipe.id == id) else {
            return Ok(false);
        };
        let removed = self.recipes.remove(index);
        if let Err(e) = self.flush() {
            self.recipes.insert(index, removed);
            return Err(e);
        }
        info!(recipe_id = %id, "saved recipe deleted");
        Ok(true)
    }

    pub fn list(&self) -> &[SavedRecipe] {
        &self.recipes
    }

    pub fn is_saved(&self, id: &str) -> bool {
        self.recipes.iter().any(|r| r.recipe.id == id)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    fn flush(&self) -> Result<(), LocalStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec(&self.recipes)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn load_slot(path: &Path) -> Vec<SavedRecipe> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "saved recipes unreadable; starting empty");
            return Vec::new();
        }
    };
    serde_json::from_slice(&raw).unwrap_or_else(|e| {
        warn!(error = %e, path = %path.display(), "saved recipes corrupt; starting empty");
        Vec::new()
    })
}
