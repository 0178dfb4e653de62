use std::sync::Arc;

use crate::app::error::{Result, SkylightError};
use crate::client::xrpc::XrpcFeedClient;
use crate::client::FeedClient;
use crate::config::{Config, SettingsHandle, TimelineSettings};
use crate::normalizer::Normalizer;
use crate::timeline::{FeedCache, ReconciliationEngine};

/// Shared application state wired up once at startup: configuration, the
/// feed client, the normalizer and the reconciliation engine.
pub struct AppContext {
    pub config: Config,
    pub settings: SettingsHandle,
    pub client: Arc<dyn FeedClient + Send + Sync>,
    pub normalizer: Normalizer,
    pub engine: Arc<ReconciliationEngine>,
}

impl AppContext {
    pub fn new() -> Result<Self> {
        let config = Config::load().map_err(|e| SkylightError::Config(e.to_string()))?;
        let client: Arc<dyn FeedClient + Send + Sync> = Arc::new(XrpcFeedClient::new(
            &config.service.base_url,
            config.service.access_token.clone(),
        )?);
        Ok(Self::assemble(config, client))
    }

    /// Build a context around an arbitrary client; used by tests.
    pub fn with_client(config: Config, client: Arc<dyn FeedClient + Send + Sync>) -> Self {
        Self::assemble(config, client)
    }

    fn assemble(config: Config, client: Arc<dyn FeedClient + Send + Sync>) -> Self {
        let settings = SettingsHandle::new(TimelineSettings::from(&config.timeline));
        let normalizer = Normalizer::new(config.service.handle.clone());
        let engine = Arc::new(ReconciliationEngine::new(FeedCache::new()));

        Self {
            config,
            settings,
            client,
            normalizer,
            engine,
        }
    }

    /// Whether enough credentials are configured to talk to the service.
    pub fn is_authenticated(&self) -> bool {
        !self.config.service.handle.is_empty() && !self.config.service.access_token.is_empty()
    }
}
