use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;
use crate::conversion::tts::TtsClient;
use crate::storage::{InMemoryMediaStore, MediaStore, S3MediaStore};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn MediaStore>,
    /// Shared client for outbound document fetches.
    pub http: reqwest::Client,
    pub tts: TtsClient,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let db = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let storage = Arc::new(S3MediaStore::new(&config.media).await?) as Arc<dyn MediaStore>;

        Self::from_parts(db, config, storage)
    }

    pub fn from_parts(
        db: PgPool,
        config: Arc<AppConfig>,
        storage: Arc<dyn MediaStore>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("build http client")?;
        let tts = TtsClient::new(http.clone(), config.tts.clone());
        Ok(Self {
            db,
            config,
            storage,
            http,
            tts,
        })
    }

    /// State over a lazily connecting pool and an in-memory media store.
    /// Nothing touches Postgres until a query runs.
    pub fn lazy(config: AppConfig) -> anyhow::Result<(Self, Arc<InMemoryMediaStore>)> {
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .context("lazy pool")?;
        let media = Arc::new(InMemoryMediaStore::new(config.media.public_base_url.clone()));
        let state = Self::from_parts(db, Arc::new(config), media.clone() as Arc<dyn MediaStore>)?;
        Ok((state, media))
    }
}
