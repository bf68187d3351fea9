use std::sync::Arc;

use crate::analysis::{FlyerAnalyzer, GeminiAnalyzer};
use crate::config::AppConfig;
use crate::db;
use crate::flyers::repo::{FlyerRepository, PgFlyerRepository};
use crate::storage::{Storage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub flyers: Arc<dyn FlyerRepository>,
    pub storage: Arc<dyn StorageClient>,
    /// `None` when no AI key is configured; `/api/analyze` then answers 503.
    pub analyzer: Option<Arc<dyn FlyerAnalyzer>>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = db::connect(&config.database_url).await?;
        let flyers = Arc::new(PgFlyerRepository::new(pool)) as Arc<dyn FlyerRepository>;

        let storage = Arc::new(Storage::new(&config.blob).await?) as Arc<dyn StorageClient>;

        let analyzer = match &config.gemini {
            Some(gemini) => Some(Arc::new(GeminiAnalyzer::new(gemini.clone())) as Arc<dyn FlyerAnalyzer>),
            None => {
                tracing::warn!("GEMINI_API_KEY not set; /api/analyze disabled");
                None
            }
        };

        Ok(Self {
            config,
            flyers,
            storage,
            analyzer,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        flyers: Arc<dyn FlyerRepository>,
        storage: Arc<dyn StorageClient>,
        analyzer: Option<Arc<dyn FlyerAnalyzer>>,
    ) -> Self {
        Self {
            config,
            flyers,
            storage,
            analyzer,
        }
    }
}
