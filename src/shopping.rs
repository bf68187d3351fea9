use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::recipes::Recipe;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    pub id: String,
    pub name: String,
    pub quantity: String,
    pub is_discounted: bool,
    pub checked: bool,
    pub recipe_title: String,
}

impl ShoppingItem {
    /// One line item per ingredient. Ids depend only on recipe id and
    /// position, so adding the same recipe again yields the same ids.
    pub fn from_recipe(recipe: &Recipe) -> Vec<ShoppingItem> {
        recipe
            .ingredients
            .iter()
            .enumerate()
            .map(|(i, ing)| ShoppingItem {
                id: format!("{}-ing-{}", recipe.id, i),
                name: ing.name.clone(),
                quantity: ing.quantity.clone(),
                is_discounted: ing.is_discounted,
                checked: false,
                recipe_title: recipe.title.clone(),
            })
            .collect()
    }
}

/// Session-scoped shopping list. Not persisted.
#[derive(Debug, Default, Clone)]
pub struct ShoppingList {
    items: Vec<ShoppingItem>,
}

impl ShoppingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends items whose id is not present yet. Returns how many were added.
    pub fn add_items(&mut self, items: impl IntoIterator<Item = ShoppingItem>) -> usize {
        let mut known: HashSet<String> = self.items.iter().map(|i| i.id.clone()).collect();
        let before = self.items.len();
        for item in items {
            if known.insert(item.id.clone()) {
                self.items.push(item);
            }
        }
        let added = self.items.len() - before;
        debug!(added, total = self.items.len(), "shopping items added");
        added
    }

    pub fn toggle(&mut self, id: &str) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            item.checked = !item.checked;
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        before != self.items.len()
    }

    /// Drops every checked item. Returns how many were removed.
    pub fn clear_checked(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|i| !i.checked);
        before - self.items.len()
    }

    pub fn items(&self) -> &[ShoppingItem] {
        &self.items
    }

    pub fn checked_count(&self) -> usize {
        self.items.iter().filter(|i| i.checked).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items grouped by recipe title, groups in first-seen order.
    pub fn grouped(&self) -> Vec<(&str, Vec<&ShoppingItem>)> {
        let mut groups: Vec<(&str, Vec<&ShoppingItem>)> = Vec::new();
        for item in &self.items {
            match groups.iter_mut().find(|(title, _)| *title == item.recipe_title) {
                Some((_, members)) => members.push(item),
                None => groups.push((item.recipe_title.as_str(), vec![item])),
            }
        }
        groups
    }
}
