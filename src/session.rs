//! Everything one user session needs, owned in one place.

use std::sync::Arc;

use tracing::info;

use crate::{
    analysis::{FlyerAnalyzer, HttpAnalyzer},
    config::ClientConfig,
    errors::LocalStoreError,
    flyers::client::{FlyerPersistence, HttpFlyerClient},
    history::{FlyerHistory, HistoryState},
    recipes::{Recipe, SavedRecipeStore},
    shopping::{ShoppingItem, ShoppingList},
    workflow::WorkflowController,
};

pub struct Session {
    workflow: WorkflowController,
    persistence: Arc<dyn FlyerPersistence>,
    saved: SavedRecipeStore,
    shopping: ShoppingList,
    history: FlyerHistory,
}

impl Session {
    pub fn new(
        analyzer: Arc<dyn FlyerAnalyzer>,
        persistence: Arc<dyn FlyerPersistence>,
        saved: SavedRecipeStore,
    ) -> Self {
        Self {
            workflow: WorkflowController::new(analyzer, Arc::clone(&persistence)),
            persistence,
            saved,
            shopping: ShoppingList::new(),
            history: FlyerHistory::new(),
        }
    }

    /// Session talking to a running server, with the saved-recipe slot in
    /// the configured data directory.
    pub fn from_config(config: &ClientConfig) -> Self {
        info!(api = %config.api_url, data_dir = %config.data_dir.display(), "opening session");
        Self::new(
            Arc::new(HttpAnalyzer::new(config.api_url.clone())),
            Arc::new(HttpFlyerClient::new(config.api_url.clone())),
            SavedRecipeStore::open(&config.data_dir),
        )
    }

    pub fn workflow(&self) -> &WorkflowController {
        &self.workflow
    }

    pub fn saved(&self) -> &SavedRecipeStore {
        &self.saved
    }

    pub fn shopping(&self) -> &ShoppingList {
        &self.shopping
    }

    pub fn shopping_mut(&mut self) -> &mut ShoppingList {
        &mut self.shopping
    }

    pub fn history(&self) -> &FlyerHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut FlyerHistory {
        &mut self.history
    }

    /// Bookmarks `recipe` together with the deals of the current result.
    pub fn save_recipe(&mut self, recipe: &Recipe) -> Result<bool, LocalStoreError> {
        let deals = self
            .workflow
            .result()
            .map(|r| r.detected_deals)
            .unwrap_or_default();
        self.saved.save(recipe, &deals)
    }

    pub fn delete_saved(&mut self, id: &str) -> Result<bool, LocalStoreError> {
        self.saved.delete(id)
    }

    pub fn add_to_shopping_list(&mut self, recipe: &Recipe) -> usize {
        self.shopping.add_items(ShoppingItem::from_recipe(recipe))
    }

    pub async fn refresh_history(&mut self) -> &HistoryState {
        self.history.load(self.persistence.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::fixtures::recipe;
    use crate::test_utils::{image, RecordingPersistence, StubAnalyzer};

    fn session(dir: &std::path::Path) -> (Session, Arc<RecordingPersistence>) {
        let persistence = Arc::new(RecordingPersistence::default());
        let session = Session::new(
            Arc::new(StubAnalyzer::flyer()),
            persistence.clone(),
            SavedRecipeStore::open(dir),
        );
        (session, persistence)
    }

    #[tokio::test]
    async fn saved_recipe_carries_the_current_deals() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = session(dir.path());
        session.workflow().add_files([image("a.jpg")]);
        session.workflow().submit_analysis().await.unwrap();

        let first = session.workflow().result().unwrap().recipes[0].clone();
        assert!(session.save_recipe(&first).unwrap());
        assert!(!session.save_recipe(&first).unwrap());

        let saved = session.saved().list();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].flyer_deals, vec!["鶏肉"]);

        let reopened = SavedRecipeStore::open(dir.path());
        assert!(reopened.is_saved(&first.id));

        assert!(session.delete_saved(&first.id).unwrap());
        assert!(session.saved().is_empty());
    }

    #[test]
    fn saving_without_a_result_stores_no_deals() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = session(dir.path());
        session.save_recipe(&recipe("r1", "親子丼")).unwrap();
        assert!(session.saved().list()[0].flyer_deals.is_empty());
    }

    #[test]
    fn shopping_list_dedups_per_ingredient() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = session(dir.path());
        let r = recipe("r1", "親子丼");

        assert_eq!(session.add_to_shopping_list(&r), 2);
        assert_eq!(session.add_to_shopping_list(&r), 0);
        assert_eq!(session.shopping().items().len(), 2);

        session.shopping_mut().toggle("r1-ing-0");
        assert_eq!(session.shopping().checked_count(), 1);
    }

    #[tokio::test]
    async fn refresh_history_uses_the_persistence_client() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, persistence) = session(dir.path());
        persistence.fail_reads();
        assert!(matches!(session.refresh_history().await, HistoryState::Failed(_)));
        assert!(session.history().records().is_empty());
    }
}
