use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::analysis::latest::LatestAnalysis;
use crate::analysis::repo::{AnalysisStore, InMemoryAnalysisStore, PgAnalysisStore};
use crate::config::AppConfig;
use crate::vision::{OpenAiVisionClient, VisionModel};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Option<PgPool>,
    pub model: Arc<dyn VisionModel>,
    pub store: Arc<dyn AnalysisStore>,
    pub latest: LatestAnalysis,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let model = Arc::new(OpenAiVisionClient::new(&config.openai)?) as Arc<dyn VisionModel>;

        let (db, store) = match config.database_url.as_deref() {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                let store = Arc::new(PgAnalysisStore::new(db.clone())) as Arc<dyn AnalysisStore>;
                (Some(db), store)
            }
            None => {
                tracing::info!("DATABASE_URL not set; analyses are kept in memory");
                (None, Arc::new(InMemoryAnalysisStore::new()) as Arc<dyn AnalysisStore>)
            }
        };

        Ok(Self::from_parts(config, db, model, store))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        db: Option<PgPool>,
        model: Arc<dyn VisionModel>,
        store: Arc<dyn AnalysisStore>,
    ) -> Self {
        Self {
            config,
            db,
            model,
            store,
            latest: LatestAnalysis::new(None),
        }
    }

    /// Seeds the latest-id notifier from whatever the store already holds.
    pub async fn load_latest(&self) -> anyhow::Result<()> {
        if let Some(id) = self.store.latest_id().await? {
            self.latest.publish(&id);
        }
        Ok(())
    }
}
