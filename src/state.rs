use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::mailer::Mailer;
use crate::services::tokens::TokenService;

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub mailer: Mailer,

    pub tokens: TokenService,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::with_store(config, store)
    }

    /// Build state on top of an already-connected store. Tests use this with
    /// an in-memory database.
    pub fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let mailer = Mailer::from_config(&config.email)?;
        let tokens = TokenService::new(
            config.auth.jwt_secret.as_bytes(),
            config.auth.token_ttl_hours,
        );

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            mailer,
            tokens,
        })
    }
}
