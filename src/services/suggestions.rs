use std::sync::Arc;

use crate::{
    db::{Cache, CacheKey},
    error::AppResult,
    models::{ContentAttributes, HitList, SearchRequest},
    services::{
        aggregator::{merge_suggestions, SuggestionSet},
        gateway::SearchGateway,
        query_builder::suggestion_queries_for,
    },
};

/// Builds the "more like this" section of a detail page
#[derive(Clone)]
pub struct SuggestionService {
    gateway: Arc<dyn SearchGateway>,
    cache: Option<Cache>,
    ttl: u64,
}

impl SuggestionService {
    pub fn new(gateway: Arc<dyn SearchGateway>, cache: Option<Cache>, ttl: u64) -> Self {
        Self {
            gateway,
            cache,
            ttl,
        }
    }

    /// Suggestions for `item`, from cache when possible.
    ///
    /// Never fails: a failed rail is empty. Sets with a failed rail are not cached.
    pub async fn suggestions_for<T>(&self, item: &T) -> SuggestionSet
    where
        T: ContentAttributes + Sync,
    {
        let medium = item.collection_type();
        let key = CacheKey::Suggestions(medium, item.id().to_string());

        if let Some(cache) = &self.cache {
            if let Some(set) = cache.lookup::<SuggestionSet>(&key).await {
                tracing::debug!(key = %key, "Suggestions served from cache");
                return set;
            }
        }

        let queries = suggestion_queries_for(item);
        let (from_director, similar_to) = tokio::join!(
            self.run_optional(queries.from_director),
            self.gateway.search(queries.similar_to)
        );

        let complete = from_director.is_ok() && similar_to.is_ok();
        let from_director = self.absorb(from_director, "from_director");
        let similar_to = self.absorb(similar_to, "similar_to");

        let set = merge_suggestions(medium, item.id(), &from_director, &similar_to);

        tracing::info!(
            medium = %medium,
            item_id = %item.id(),
            from_director = set.from_director.len(),
            similar_to = set.similar_to.len(),
            "Suggestions built"
        );

        if complete {
            if let Some(cache) = &self.cache {
                cache.set_in_background(&key, &set, self.ttl);
            }
        }

        set
    }

    async fn run_optional(&self, request: Option<SearchRequest>) -> AppResult<HitList> {
        match request {
            Some(request) => self.gateway.search(request).await,
            None => Ok(HitList::empty()),
        }
    }

    fn absorb(&self, result: AppResult<HitList>, rail: &'static str) -> HitList {
        result.unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                rail,
                gateway = self.gateway.name(),
                "Suggestion rail failed"
            );
            HitList::empty()
        })
    }
}
