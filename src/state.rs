use deadpool_postgres::Pool;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use crate::config::Config;
use crate::error::Result;
use crate::services::tokens::TokenKeys;
use crate::storage::{HttpObjectStorage, ObjectStorage};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: Pool,
    /// The Redis connection manager.
    pub redis: ConnectionManager,
    /// The application's configuration.
    pub config: Config,
    /// The object-storage provider client.
    pub storage: Arc<dyn ObjectStorage>,
    /// Token signing/verification material.
    pub token_keys: TokenKeys,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        tracing::info!("✅ PostgreSQL Pool initialized with deadpool-postgres");

        let redis_client = redis::Client::open(config.redis_url.as_str())?;
        let redis = ConnectionManager::new(redis_client).await?;
        tracing::info!("✅ Redis Connection Manager initialized (pooled)");

        let storage: Arc<dyn ObjectStorage> = Arc::new(HttpObjectStorage::new(
            config.storage_endpoint.clone(),
            config.storage_bucket.clone(),
            config.storage_api_key.clone(),
            config.storage_timeout_secs,
        )?);
        tracing::info!("✅ Object storage client initialized: {}", config.storage_endpoint);

        let token_keys = TokenKeys::from_config(config);
        tracing::info!("✅ Token keys initialized");

        Ok(AppState {
            db,
            redis,
            config: config.clone(),
            storage,
            token_keys,
        })
    }
}
