use std::sync::Arc;

use crate::{
    config::Config,
    db::{Cache, CatalogRepository},
    services::{gateway::SearchGateway, rails::RailService, suggestions::SuggestionService},
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogRepository>,
    pub gateway: Arc<dyn SearchGateway>,
    pub suggestions: SuggestionService,
    pub rails: RailService,
    pub popular_queries_collection: String,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        gateway: Arc<dyn SearchGateway>,
        cache: Option<Cache>,
        config: &Config,
    ) -> Self {
        Self {
            catalog,
            suggestions: SuggestionService::new(
                gateway.clone(),
                cache.clone(),
                config.suggestion_cache_ttl,
            ),
            rails: RailService::new(gateway.clone(), cache, config.trending_cache_ttl),
            gateway,
            popular_queries_collection: config.popular_queries_collection.clone(),
        }
    }
}
