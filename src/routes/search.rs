use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, RawQuery, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{FacetCount, Medium},
    routes::AppState,
    services::{
        aggregator::{cards, MediaCard},
        autocomplete::{fetch_autocomplete, AutocompleteResults},
        facets::{parse_query_string, range_stats, FacetLayout, RefinementChip, RefinementState},
        gateway::execute_single,
        rails::{Breakpoint, Rails},
        range_facet::{RangeFacet, RangeFacetView},
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RailsQuery {
    user_id: Option<String>,
    breakpoint: Option<String>,
}

/// One page of a browse session with its refinement state
#[derive(Debug, Serialize)]
pub struct BrowsePage {
    pub hits: Vec<MediaCard>,
    pub found: u64,
    pub page: u32,
    pub per_page: u32,
    pub is_last_page: bool,
    pub refinements: Vec<RefinementChip>,
    pub facet_counts: Vec<FacetCount>,
    pub ranges: BTreeMap<String, RangeFacetView>,
    /// Canonical deep link of the restored state
    pub query_string: String,
}

fn parse_medium(route: &str) -> AppResult<Medium> {
    Medium::from_route(route)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown medium: {}", route)))
}

/// Movies, shows and popular queries for the search box
pub async fn autocomplete(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteQuery>,
) -> Json<AutocompleteResults> {
    let results = fetch_autocomplete(
        state.gateway.as_ref(),
        &params.q,
        &state.popular_queries_collection,
    )
    .await;

    Json(results)
}

pub async fn rails(
    State(state): State<AppState>,
    Path(medium): Path<String>,
    Query(params): Query<RailsQuery>,
) -> AppResult<Json<Rails>> {
    let medium = parse_medium(&medium)?;
    let breakpoint = Breakpoint::from_name(params.breakpoint.as_deref());

    let rails = state
        .rails
        .load(medium, params.user_id.as_deref(), breakpoint)
        .await;

    Ok(Json(rails))
}

/// Browse grid restored from an instant-search deep link
pub async fn browse(
    State(state): State<AppState>,
    Path(medium): Path<String>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<BrowsePage>> {
    let medium = parse_medium(&medium)?;
    let layout = FacetLayout::for_medium(medium);
    let pairs = parse_query_string(query.as_deref().unwrap_or_default());

    let breakpoint = Breakpoint::from_name(
        pairs
            .iter()
            .find(|(key, _)| key == "breakpoint")
            .map(|(_, value)| value.as_str()),
    );
    let per_page = breakpoint.page_size();

    let refinement = RefinementState::from_pairs(
        &layout,
        pairs.iter().map(|(key, value)| (key.as_str(), value.as_str())),
    );
    let request = refinement.to_search_request(medium, &layout, per_page);
    let hits = execute_single(state.gateway.as_ref(), request).await;

    let page = refinement.page.unwrap_or(1);
    let ranges = layout
        .ranges
        .iter()
        .map(|attribute| {
            let mut facet = RangeFacet::new(&range_stats(&hits, attribute), None);
            facet.sync(refinement.ranges.get(*attribute).copied());
            (attribute.to_string(), facet.view())
        })
        .collect();

    tracing::info!(
        medium = %medium,
        found = hits.found,
        page,
        refinements = refinement.refinements.len(),
        "Browse page served"
    );

    Ok(Json(BrowsePage {
        hits: cards(medium, &hits),
        found: hits.found,
        page,
        per_page,
        is_last_page: u64::from(page) * u64::from(per_page) >= hits.found,
        refinements: refinement.current_refinements(&layout),
        query_string: refinement.to_query_string(&layout.index_id),
        facet_counts: hits.facet_counts,
        ranges,
    }))
}
