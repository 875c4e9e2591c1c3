use crate::config::Config;
use crate::db::DbPool;
use std::sync::Arc;

/// Shared handles cloned into every handler. The reqwest client is reused
/// across webhook deliveries.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }
}
