use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::middlewares::auth::JwtService;

pub mod attempt_engine;
pub mod game_service;
pub mod question_bank;
pub mod score_service;
pub mod store;
pub mod unlock_service;

use game_service::GameService;
use question_bank::QuestionBank;
use store::{LocalUserStore, MongoUserStore, UserStore};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn UserStore>,
    pub game: GameService,
    pub jwt: JwtService,
}

impl AppState {
    /// Opens the configured backend and loads the question bank.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn UserStore> = match config.storage_backend {
            StorageBackend::Mongo => {
                let client = mongodb::Client::with_uri_str(&config.mongo_uri).await?;
                let store = MongoUserStore::new(client.database(&config.mongo_database));
                store.ping().await?;
                tracing::info!("MongoDB connected ({})", config.mongo_database);
                Arc::new(store)
            }
            StorageBackend::Local => match &config.local_store_path {
                Some(path) => Arc::new(LocalUserStore::open(path).await?),
                None => {
                    tracing::warn!("LOCAL_STORE_PATH not set, progress is kept in memory only");
                    Arc::new(LocalUserStore::in_memory())
                }
            },
        };

        let bank = QuestionBank::load(&config.question_bank_path).await?;
        Ok(Self::with_parts(config, store, bank))
    }

    pub fn with_parts(config: Config, store: Arc<dyn UserStore>, bank: QuestionBank) -> Self {
        tracing::info!("Using {} user store", store.backend_name());
        Self {
            jwt: JwtService::new(&config.jwt_secret),
            game: GameService::new(bank, store.clone()),
            store,
            config,
        }
    }
}
