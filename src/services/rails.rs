/// Index-page rails
///
/// "For You", "Trending" and the browse grid each run as an independent search session
/// with their own base parameters. A failing rail comes back empty without affecting
/// the others.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::AppResult,
    models::{HitList, Medium, SearchRequest},
    services::{
        aggregator::{cards, MediaCard},
        facets::browse_base_request,
        gateway::{execute_independent, SearchGateway},
        query_builder::{FilterExpression, ScoringExpression, SortSpec},
    },
};

pub const TRENDING_PAGE_SIZE: u32 = 15;

/// Viewport width class reported by the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Xl,
    Lg,
    Md,
    Sm,
    #[default]
    Xs,
}

impl Breakpoint {
    /// Unknown or missing names fall back to the narrowest layout
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(|name| name.trim().to_ascii_lowercase()).as_deref() {
            Some("xl") => Breakpoint::Xl,
            Some("lg") => Breakpoint::Lg,
            Some("md") => Breakpoint::Md,
            Some("sm") => Breakpoint::Sm,
            _ => Breakpoint::Xs,
        }
    }

    /// Browse grid page size, a whole number of rows at this width
    pub fn page_size(self) -> u32 {
        match self {
            Breakpoint::Xl => 18,
            Breakpoint::Lg => 12,
            Breakpoint::Md => 9,
            Breakpoint::Sm => 6,
            Breakpoint::Xs => 4,
        }
    }
}

/// Popularity formula of the trending rail
pub fn trending_scoring() -> ScoringExpression {
    ScoringExpression::new()
        .tier(FilterExpression::greater_than("num_votes", 3000), 5)
        .tier(FilterExpression::greater_than("average_rating", 7.0), 2)
        .tier(FilterExpression::greater_than("average_rating", 6.0), 3)
        .tier(FilterExpression::less_than("average_rating", 5.0), 1)
}

pub fn trending_sort(medium: Medium) -> SortSpec {
    SortSpec::new()
        .then_eval(trending_scoring())
        .then_desc(medium.year_field())
        .then_desc("num_votes")
}

pub fn base_request(medium: Medium, breakpoint: Breakpoint) -> SearchRequest {
    browse_base_request(medium)
        .with_query("*")
        .with_per_page(breakpoint.page_size())
}

pub fn trending_request(medium: Medium) -> SearchRequest {
    SearchRequest::new(medium.collection())
        .with_query("*")
        .with_query_by("title,description")
        .with_sort(trending_sort(medium))
        .with_per_page(TRENDING_PAGE_SIZE)
}

/// Personalized rail; `None` for anonymous viewers
pub fn recommendations_request(medium: Medium, user_id: Option<&str>) -> Option<SearchRequest> {
    let user_id = user_id.map(str::trim).filter(|id| !id.is_empty())?;
    Some(
        SearchRequest::new(medium.collection())
            .with_query("*")
            .with_preset(medium.recommendation_preset())
            .with_personalization_user(user_id),
    )
}

/// Search parameters of every rail, handed to clients that run the sessions themselves
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RailPresets {
    pub base: SearchRequest,
    pub trending: SearchRequest,
    pub recommendations: Option<SearchRequest>,
}

impl RailPresets {
    pub fn new(medium: Medium, breakpoint: Breakpoint, user_id: Option<&str>) -> Self {
        Self {
            base: base_request(medium, breakpoint),
            trending: trending_request(medium),
            recommendations: recommendations_request(medium, user_id),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Rails {
    pub for_you: Vec<MediaCard>,
    pub trending: Vec<MediaCard>,
    pub browse: Vec<MediaCard>,
}

/// Runs the rails of a medium's index page
#[derive(Clone)]
pub struct RailService {
    gateway: Arc<dyn SearchGateway>,
    cache: Option<Cache>,
    trending_ttl: u64,
}

impl RailService {
    pub fn new(gateway: Arc<dyn SearchGateway>, cache: Option<Cache>, trending_ttl: u64) -> Self {
        Self {
            gateway,
            cache,
            trending_ttl,
        }
    }

    /// All three rails, concurrently
    pub async fn load(
        &self,
        medium: Medium,
        user_id: Option<&str>,
        breakpoint: Breakpoint,
    ) -> Rails {
        let for_you_request = recommendations_request(medium, user_id);
        let has_for_you = for_you_request.is_some();

        let sessions: Vec<SearchRequest> = for_you_request
            .into_iter()
            .chain(std::iter::once(base_request(medium, breakpoint)))
            .collect();

        let (trending, mut lists) = tokio::join!(
            self.trending(medium),
            execute_independent(self.gateway.clone(), sessions)
        );

        let browse = lists.pop().unwrap_or_default();
        let for_you = if has_for_you {
            lists.pop().unwrap_or_default()
        } else {
            HitList::empty()
        };

        let rails = Rails {
            for_you: cards(medium, &for_you),
            trending,
            browse: cards(medium, &browse),
        };

        tracing::info!(
            medium = %medium,
            for_you = rails.for_you.len(),
            trending = rails.trending.len(),
            browse = rails.browse.len(),
            "Rails loaded"
        );

        rails
    }

    /// Trending cards, cached per medium; failures yield an empty rail and are not cached
    pub async fn trending(&self, medium: Medium) -> Vec<MediaCard> {
        match self.trending_cached(medium).await {
            Ok(cards) => cards,
            Err(e) => {
                tracing::warn!(error = %e, medium = %medium, "Trending rail failed");
                Vec::new()
            }
        }
    }

    async fn trending_cached(&self, medium: Medium) -> AppResult<Vec<MediaCard>> {
        let gateway = self.gateway.clone();
        cached!(
            self.cache.as_ref(),
            CacheKey::Trending(medium),
            self.trending_ttl,
            async move {
                let hits = gateway.search(trending_request(medium)).await?;
                AppResult::Ok(cards(medium, &hits))
            }
        )
    }
}
