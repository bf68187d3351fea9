//! Remote flyer history as a view-model.

use time::Date;
use tracing::warn;

use crate::flyers::{client::FlyerPersistence, dto::FlyerRecord};

pub const HISTORY_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryState {
    Loading,
    Loaded(Vec<FlyerRecord>),
    Failed(String),
}

/// Card header for one flyer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlyerSummary {
    pub id: i32,
    pub store_name: String,
    pub flyer_date: Date,
    pub image_count: usize,
    pub discounted: usize,
    pub regular: usize,
}

impl From<&FlyerRecord> for FlyerSummary {
    fn from(r: &FlyerRecord) -> Self {
        Self {
            id: r.id,
            store_name: r.store_name.clone(),
            flyer_date: r.flyer_date,
            image_count: r.image_urls.len(),
            discounted: r.discounted_items().count(),
            regular: r.regular_items().count(),
        }
    }
}

#[derive(Debug)]
pub struct FlyerHistory {
    state: HistoryState,
    expanded: Option<i32>,
}

impl Default for FlyerHistory {
    fn default() -> Self {
        Self {
            state: HistoryState::Loading,
            expanded: None,
        }
    }
}

impl FlyerHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the newest flyers. Also the retry path after a failure.
    pub async fn load(&mut self, persistence: &dyn FlyerPersistence) -> &HistoryState {
        self.state = HistoryState::Loading;
        self.state = match persistence.list_flyers(HISTORY_LIMIT).await {
            Ok(records) => {
                if self
                    .expanded
                    .is_some_and(|id| !records.iter().any(|r| r.id == id))
                {
                    self.expanded = None;
                }
                HistoryState::Loaded(records)
            }
            Err(e) => {
                warn!(error = %e, "flyer history load failed");
                HistoryState::Failed(e.to_string())
            }
        };
        &self.state
    }

    pub fn state(&self) -> &HistoryState {
        &self.state
    }

    pub fn records(&self) -> &[FlyerRecord] {
        match &self.state {
            HistoryState::Loaded(records) => records,
            _ => &[],
        }
    }

    pub fn summaries(&self) -> Vec<FlyerSummary> {
        self.records().iter().map(FlyerSummary::from).collect()
    }

    /// At most one card is open; toggling the open one closes it.
    pub fn toggle_expanded(&mut self, id: i32) {
        self.expanded = if self.expanded == Some(id) { None } else { Some(id) };
    }

    pub fn expanded(&self) -> Option<&FlyerRecord> {
        let id = self.expanded?;
        self.records().iter().find(|r| r.id == id)
    }
}
