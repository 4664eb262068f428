//! Application state.

use std::sync::Arc;

use storycraft_openai::OpenAiClient;
use storycraft_storage::{MediaStorage, StorageConfig};
use storycraft_store::{Db, JobRepository, LedgerRepository, UserRepository};

use crate::auth::TokenIssuer;
use crate::config::ApiConfig;
use crate::services::GenerationService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub db: Db,
    pub users: UserRepository,
    pub ledger: LedgerRepository,
    pub jobs: JobRepository,
    pub auth: TokenIssuer,
    pub storage: Arc<dyn MediaStorage>,
    pub generation: Arc<GenerationService>,
}

impl AppState {
    /// Create new application state from the environment.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Db::connect(&config.database_url).await?;
        db.migrate().await?;

        let storage = StorageConfig::from_env()?.build();
        let openai = OpenAiClient::from_env()?;

        Ok(Self::from_parts(config, db, openai, storage))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: ApiConfig,
        db: Db,
        openai: OpenAiClient,
        storage: Arc<dyn MediaStorage>,
    ) -> Self {
        let auth = TokenIssuer::new(&config.jwt_secret, config.jwt_expires_minutes);
        let generation = Arc::new(GenerationService::new(
            db.jobs(),
            openai,
            Arc::clone(&storage),
            config.credits_per_second,
        ));

        Self {
            users: db.users(),
            ledger: db.ledger(),
            jobs: db.jobs(),
            auth,
            storage,
            generation,
            config,
            db,
        }
    }
}
