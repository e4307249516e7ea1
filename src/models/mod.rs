use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod search;

pub use search::{
    AnalyticsEvent, ClickData, FacetCount, FacetStats, FacetValueCount, Hit, HitList,
    MultiSearchParams, MultiSearchResponse, MultiSearchResult, SearchRequest, SearchResponse,
};

/// The two kinds of catalog content.
///
/// Every per-medium constant (engine collection, route, year field, ...) lives here so
/// the query, aggregation and URL code never branches on raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Medium {
    Movie,
    TvShow,
}

impl Medium {
    pub const ALL: [Medium; 2] = [Medium::Movie, Medium::TvShow];

    /// Engine collection holding documents of this medium
    pub fn collection(self) -> &'static str {
        match self {
            Medium::Movie => "Movie",
            Medium::TvShow => "TvShow",
        }
    }

    /// First path segment of the page routes
    pub fn route(self) -> &'static str {
        match self {
            Medium::Movie => "movies",
            Medium::TvShow => "tv_shows",
        }
    }

    pub fn display_title(self) -> &'static str {
        match self {
            Medium::Movie => "Movies",
            Medium::TvShow => "TV Shows",
        }
    }

    pub fn breadcrumb_label(self) -> &'static str {
        match self {
            Medium::Movie => "Movies",
            Medium::TvShow => "TV",
        }
    }

    /// Join relation used to reach a person through the directors collection
    pub fn director_relation(self) -> &'static str {
        match self {
            Medium::Movie => "$MovieDirector",
            Medium::TvShow => "$TvShowDirector",
        }
    }

    /// Document field carrying the year shown on cards
    pub fn year_field(self) -> &'static str {
        match self {
            Medium::Movie => "release_year",
            Medium::TvShow => "start_year",
        }
    }

    /// Instant-search index id of the browse section, also its page anchor
    pub fn browse_index_id(self) -> String {
        format!("all-{}", self.route())
    }

    pub fn recommendation_preset(self) -> &'static str {
        match self {
            Medium::Movie => "movie_recommendations",
            Medium::TvShow => "tv_show_recommendations",
        }
    }

    pub fn click_event_name(self) -> String {
        format!("{}_click", self.as_str())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Medium::Movie => "movie",
            Medium::TvShow => "tv_show",
        }
    }

    /// Detail page path for a document id
    pub fn detail_path(self, id: &str) -> String {
        format!("/{}/{}", self.route(), id)
    }

    pub fn from_route(route: &str) -> Option<Self> {
        Medium::ALL.into_iter().find(|m| m.route() == route)
    }
}

impl Display for Medium {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared view over movies and TV shows used by query construction
pub trait ContentAttributes {
    fn id(&self) -> &str;
    fn title(&self) -> &str;
    /// Genre names, primary genre first
    fn genres(&self) -> Vec<&str>;
    /// Person ids of the credited directors, in billing order
    fn director_ids(&self) -> Vec<i64>;
    fn collection_type(&self) -> Medium;
    fn display_year(&self) -> Option<i32>;
}

/// A genre or country reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub id: i64,
    pub full_name: String,
}

/// A director credit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credit {
    pub id: i64,
    pub person: Person,
}

/// Attributes common to both media
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub primary_image_url: Option<String>,
    #[serde(default)]
    pub content_rating: Option<String>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub num_votes: Option<i64>,
    #[serde(default)]
    pub genres: Vec<NamedRef>,
    #[serde(default)]
    pub countries: Vec<NamedRef>,
    #[serde(default)]
    pub directors: Vec<Credit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub runtime_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TvShow {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default)]
    pub total_seasons: Option<i32>,
    #[serde(default)]
    pub total_episodes: Option<i32>,
}

/// A catalog item, discriminated by `collection_type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "collection_type", rename_all = "snake_case")]
pub enum ContentItem {
    Movie(Movie),
    TvShow(TvShow),
}

impl ContentItem {
    pub fn entry(&self) -> &CatalogEntry {
        match self {
            ContentItem::Movie(movie) => &movie.entry,
            ContentItem::TvShow(show) => &show.entry,
        }
    }

    /// The first credited director, whose other work feeds the director rail
    pub fn primary_director(&self) -> Option<&Credit> {
        self.entry().directors.first()
    }
}

impl ContentAttributes for ContentItem {
    fn id(&self) -> &str {
        &self.entry().id
    }

    fn title(&self) -> &str {
        &self.entry().title
    }

    fn genres(&self) -> Vec<&str> {
        self.entry()
            .genres
            .iter()
            .map(|genre| genre.name.as_str())
            .filter(|name| !name.trim().is_empty())
            .collect()
    }

    fn director_ids(&self) -> Vec<i64> {
        self.entry()
            .directors
            .iter()
            .map(|credit| credit.person.id)
            .collect()
    }

    fn collection_type(&self) -> Medium {
        match self {
            ContentItem::Movie(_) => Medium::Movie,
            ContentItem::TvShow(_) => Medium::TvShow,
        }
    }

    fn display_year(&self) -> Option<i32> {
        match self {
            ContentItem::Movie(movie) => movie.release_year,
            ContentItem::TvShow(show) => show.start_year,
        }
    }
}

/// Navigation trail entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Breadcrumb {
    pub label: String,
    pub url: Option<String>,
}

impl Breadcrumb {
    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: Some(url.into()),
        }
    }

    pub fn current(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: None,
        }
    }
}

/// Trail starting at `Home` and ending at the medium index
pub fn medium_breadcrumbs(medium: Medium) -> Vec<Breadcrumb> {
    vec![
        Breadcrumb::link("Home", "/"),
        Breadcrumb::link(medium.breadcrumb_label(), format!("/{}", medium.route())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_movie() -> ContentItem {
        ContentItem::Movie(Movie {
            entry: CatalogEntry {
                id: "42".to_string(),
                title: "Heat".to_string(),
                description: None,
                primary_image_url: None,
                content_rating: Some("R".to_string()),
                average_rating: Some(8.3),
                num_votes: Some(700_000),
                genres: vec![
                    NamedRef {
                        id: 1,
                        name: "Crime".to_string(),
                    },
                    NamedRef {
                        id: 2,
                        name: "Drama".to_string(),
                    },
                ],
                countries: vec![],
                directors: vec![Credit {
                    id: 9,
                    person: Person {
                        id: 77,
                        full_name: "Michael Mann".to_string(),
                    },
                }],
            },
            release_year: Some(1995),
            runtime_minutes: Some(170),
        })
    }

    #[test]
    fn test_medium_constants() {
        assert_eq!(Medium::Movie.collection(), "Movie");
        assert_eq!(Medium::TvShow.route(), "tv_shows");
        assert_eq!(Medium::TvShow.browse_index_id(), "all-tv_shows");
        assert_eq!(Medium::Movie.click_event_name(), "movie_click");
        assert_eq!(Medium::TvShow.year_field(), "start_year");
        assert_eq!(Medium::Movie.detail_path("12"), "/movies/12");
    }

    #[test]
    fn test_medium_from_route() {
        assert_eq!(Medium::from_route("movies"), Some(Medium::Movie));
        assert_eq!(Medium::from_route("tv_shows"), Some(Medium::TvShow));
        assert_eq!(Medium::from_route("books"), None);
    }

    #[test]
    fn test_content_item_serializes_with_collection_type() {
        let json = serde_json::to_value(sample_movie()).unwrap();
        assert_eq!(json["collection_type"], "movie");
        assert_eq!(json["title"], "Heat");
        assert_eq!(json["release_year"], 1995);
    }

    #[test]
    fn test_content_attributes() {
        let movie = sample_movie();
        assert_eq!(movie.id(), "42");
        assert_eq!(movie.genres(), vec!["Crime", "Drama"]);
        assert_eq!(movie.collection_type(), Medium::Movie);
        assert_eq!(movie.display_year(), Some(1995));
        assert_eq!(movie.director_ids(), vec![77]);
        assert_eq!(movie.primary_director().unwrap().person.id, 77);
    }

    #[test]
    fn test_tv_show_display_year_uses_start_year() {
        let show: ContentItem = serde_json::from_str(
            r#"{"collection_type":"tv_show","id":"5","title":"Fargo","start_year":2014,"end_year":2024}"#,
        )
        .unwrap();
        assert_eq!(show.collection_type(), Medium::TvShow);
        assert_eq!(show.display_year(), Some(2014));
    }
}
