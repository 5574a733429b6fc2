use crate::application::classifier::ErrorClassifier;
use crate::domain::error::LeagueError;
use crate::domain::traits::LeagueApi;
use crate::infrastructure::config::Config;
use crate::infrastructure::executor::RequestExecutor;
use crate::infrastructure::network::client::HttpLeagueApi;
use crate::infrastructure::network::http::create_client;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn LeagueApi>,
    pub executor: RequestExecutor,
    pub classifier: ErrorClassifier,
    pub config: Arc<RwLock<Config>>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, LeagueError> {
        let http_client = create_client(&config)?;
        let api = HttpLeagueApi::new(http_client, &config.api);
        Ok(Self::with_api(Arc::new(api), config))
    }

    /// Build state around any backend implementation.
    pub fn with_api(api: Arc<dyn LeagueApi>, config: Config) -> Self {
        Self {
            api,
            executor: RequestExecutor::with_default_ttl(config.cache.default_ttl()),
            classifier: ErrorClassifier::new(),
            config: Arc::new(RwLock::new(config)),
        }
    }
}
