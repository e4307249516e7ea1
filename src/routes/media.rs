use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{medium_breadcrumbs, Breadcrumb, ContentAttributes, ContentItem, Medium},
    routes::AppState,
    services::{
        aggregator::SuggestionSet,
        facets::{facet_link, FacetLayout},
        rails::{Breakpoint, RailPresets},
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    user_id: Option<String>,
    breakpoint: Option<String>,
}

/// Payload of a medium's index page
#[derive(Debug, Serialize)]
pub struct IndexPage {
    pub title: &'static str,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub section_id: String,
    pub presets: RailPresets,
    pub facets: FacetLayout,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FacetLink {
    pub label: String,
    pub url: String,
}

/// Browse deep links for the facet values of one item
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ItemLinks {
    pub genres: Vec<FacetLink>,
    pub countries: Vec<FacetLink>,
    pub directors: Vec<FacetLink>,
}

impl ItemLinks {
    pub fn for_item(item: &ContentItem) -> Self {
        let medium = item.collection_type();
        let entry = item.entry();
        let link = |attribute: &str, label: &str| FacetLink {
            label: label.to_string(),
            url: facet_link(medium, attribute, label),
        };

        Self {
            genres: entry.genres.iter().map(|g| link("genres", &g.name)).collect(),
            countries: entry
                .countries
                .iter()
                .map(|c| link("countries", &c.name))
                .collect(),
            directors: entry
                .directors
                .iter()
                .filter(|credit| !credit.person.full_name.is_empty())
                .map(|credit| link("directors", &credit.person.full_name))
                .collect(),
        }
    }
}

/// Payload of a detail page: the flattened item plus its suggestions
#[derive(Debug, Serialize)]
pub struct ShowPage {
    #[serde(flatten)]
    pub item: ContentItem,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub suggestions: SuggestionSet,
    pub links: ItemLinks,
}

pub async fn movies_index(Query(query): Query<IndexQuery>) -> Json<IndexPage> {
    index(Medium::Movie, query)
}

pub async fn tv_shows_index(Query(query): Query<IndexQuery>) -> Json<IndexPage> {
    index(Medium::TvShow, query)
}

pub async fn movie_show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ShowPage>> {
    show(&state, Medium::Movie, &id).await
}

pub async fn tv_show_show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ShowPage>> {
    show(&state, Medium::TvShow, &id).await
}

fn index(medium: Medium, query: IndexQuery) -> Json<IndexPage> {
    let breakpoint = Breakpoint::from_name(query.breakpoint.as_deref());

    Json(IndexPage {
        title: medium.display_title(),
        breadcrumbs: medium_breadcrumbs(medium),
        section_id: medium.browse_index_id(),
        presets: RailPresets::new(medium, breakpoint, query.user_id.as_deref()),
        facets: FacetLayout::for_medium(medium),
    })
}

async fn show(state: &AppState, medium: Medium, id: &str) -> AppResult<Json<ShowPage>> {
    let not_found = || AppError::NotFound(format!("{} {}", medium, id));
    let numeric_id = id.trim().parse::<i64>().map_err(|_| not_found())?;

    let item = state
        .catalog
        .find(medium, numeric_id)
        .await?
        .ok_or_else(not_found)?;

    let suggestions = state.suggestions.suggestions_for(&item).await;

    let mut breadcrumbs = medium_breadcrumbs(medium);
    breadcrumbs.push(Breadcrumb::current(item.entry().title.clone()));

    Ok(Json(ShowPage {
        links: ItemLinks::for_item(&item),
        item,
        breadcrumbs,
        suggestions,
    }))
}
