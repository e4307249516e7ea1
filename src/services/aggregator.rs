/// Result aggregation
///
/// Turns raw engine documents into typed media cards and merges the two suggestion
/// rails of a detail page into one payload.
use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    models::{HitList, Medium},
    services::query_builder::SUGGESTION_PAGE_SIZE,
};

/// Card shown in rails and suggestion lists, identical for both media
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaCard {
    pub id: String,
    pub title: String,
    pub primary_image_url: Option<String>,
    pub average_rating: Option<f64>,
    /// `release_year` for movies, `start_year` for shows
    pub year: Option<i32>,
    /// Only set for shows that have ended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_year: Option<i32>,
    #[serde(default)]
    pub genre_names: Vec<String>,
    pub collection_type: Medium,
}

impl MediaCard {
    pub fn href(&self) -> String {
        self.collection_type.detail_path(&self.id)
    }
}

#[derive(Debug, Deserialize)]
struct MovieDocument {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    title: String,
    #[serde(default)]
    primary_image_url: Option<String>,
    #[serde(default)]
    average_rating: Option<f64>,
    #[serde(default)]
    release_year: Option<i32>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    genre_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TvShowDocument {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    title: String,
    #[serde(default)]
    primary_image_url: Option<String>,
    #[serde(default)]
    average_rating: Option<f64>,
    #[serde(default)]
    start_year: Option<i32>,
    #[serde(default)]
    end_year: Option<i32>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    genre_names: Vec<String>,
}

/// Display names win over the filterable `genres` field when the index carries both
fn display_genres(genre_names: Vec<String>, genres: Vec<String>) -> Vec<String> {
    if genre_names.is_empty() {
        genres
    } else {
        genre_names
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

/// Parses one engine document of `medium` into a card; `None` when required fields are missing
pub fn card_from_document(medium: Medium, document: &Value) -> Option<MediaCard> {
    let card = match medium {
        Medium::Movie => serde_json::from_value::<MovieDocument>(document.clone())
            .map(|doc| MediaCard {
                id: doc.id,
                title: doc.title,
                primary_image_url: doc.primary_image_url,
                average_rating: doc.average_rating,
                year: doc.release_year,
                end_year: None,
                genre_names: display_genres(doc.genre_names, doc.genres),
                collection_type: Medium::Movie,
            }),
        Medium::TvShow => serde_json::from_value::<TvShowDocument>(document.clone())
            .map(|doc| MediaCard {
                id: doc.id,
                title: doc.title,
                primary_image_url: doc.primary_image_url,
                average_rating: doc.average_rating,
                year: doc.start_year,
                end_year: doc.end_year,
                genre_names: display_genres(doc.genre_names, doc.genres),
                collection_type: Medium::TvShow,
            }),
    };

    match card {
        Ok(card) => Some(card),
        Err(e) => {
            tracing::debug!(error = %e, medium = %medium, "Skipping malformed document");
            None
        }
    }
}

/// Cards of a hit list, in engine order
pub fn cards(medium: Medium, hits: &HitList) -> Vec<MediaCard> {
    hits.documents()
        .filter_map(|document| card_from_document(medium, document))
        .collect()
}

/// "More like this" payload of a detail page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SuggestionSet {
    pub from_director: Vec<MediaCard>,
    pub similar_to: Vec<MediaCard>,
}

impl SuggestionSet {
    /// The director section is left out of the page when it has nothing to show
    pub fn has_director_section(&self) -> bool {
        !self.from_director.is_empty()
    }
}

/// Merges both suggestion rails.
///
/// Each list drops the current item and repeated ids and is capped at the rail size.
/// The lists are not deduplicated against each other.
pub fn merge_suggestions(
    medium: Medium,
    item_id: &str,
    from_director: &HitList,
    similar_to: &HitList,
) -> SuggestionSet {
    SuggestionSet {
        from_director: suggestion_rail(medium, item_id, from_director),
        similar_to: suggestion_rail(medium, item_id, similar_to),
    }
}

fn suggestion_rail(medium: Medium, item_id: &str, hits: &HitList) -> Vec<MediaCard> {
    let mut seen = HashSet::new();
    cards(medium, hits)
        .into_iter()
        .filter(|card| card.id != item_id)
        .filter(|card| seen.insert(card.id.clone()))
        .take(SUGGESTION_PAGE_SIZE as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Hit;
    use serde_json::json;

    fn hits(documents: Vec<Value>) -> HitList {
        HitList {
            found: documents.len() as u64,
            hits: documents
                .into_iter()
                .map(|document| Hit {
                    document,
                    text_match: None,
                })
                .collect(),
            page: 1,
            facet_counts: vec![],
        }
    }

    fn movie(id: &str) -> Value {
        json!({
            "id": id,
            "title": format!("Movie {}", id),
            "release_year": 1995,
            "average_rating": 8.1,
            "genres": ["Crime", "Drama"]
        })
    }

    /// Document shaped like the indexed movie schema
    fn indexed_movie(id: &str, title: &str) -> Value {
        json!({
            "id": id,
            "title": title,
            "release_year": 1998,
            "runtime_minutes": 122,
            "average_rating": 7.2,
            "num_votes": 230000,
            "primary_genre": "Action",
            "secondary_genre": "Crime",
            "genres": ["Action", "Crime"],
            "genre_names": ["Action", "Crime", "Thriller"],
            "directors": ["John Frankenheimer"],
            "countries": ["United States"]
        })
    }

    #[test]
    fn test_indexed_documents_with_both_genre_fields_are_kept() {
        let card = card_from_document(Medium::Movie, &indexed_movie("2", "Ronin")).unwrap();
        assert_eq!(card.id, "2");
        assert_eq!(card.year, Some(1998));
        assert_eq!(card.genre_names, vec!["Action", "Crime", "Thriller"]);

        let list = hits(vec![indexed_movie("42", "Heat"), indexed_movie("2", "Ronin")]);
        assert_eq!(cards(Medium::Movie, &list).len(), 2);

        let set = merge_suggestions(Medium::Movie, "42", &list, &list);
        assert_eq!(set.from_director.len(), 1);
        assert_eq!(set.similar_to[0].title, "Ronin");
    }

    #[test]
    fn test_genres_used_when_display_names_missing() {
        let card = card_from_document(Medium::Movie, &movie("3")).unwrap();
        assert_eq!(card.genre_names, vec!["Crime", "Drama"]);
    }

    #[test]
    fn test_year_field_is_normalized() {
        let show = json!({
            "id": "7",
            "title": "Twin Peaks",
            "start_year": 1990,
            "end_year": 1991,
            "genre_names": ["Mystery"]
        });
        let card = card_from_document(Medium::TvShow, &show).unwrap();
        assert_eq!(card.year, Some(1990));
        assert_eq!(card.end_year, Some(1991));
        assert_eq!(card.genre_names, vec!["Mystery".to_string()]);
        assert_eq!(card.collection_type, Medium::TvShow);
        assert_eq!(card.href(), "/tv_shows/7");

        let card = card_from_document(Medium::Movie, &movie("3")).unwrap();
        assert_eq!(card.year, Some(1995));
        assert_eq!(card.collection_type, Medium::Movie);
    }

    #[test]
    fn test_numeric_ids_are_accepted() {
        let card = card_from_document(Medium::Movie, &json!({ "id": 12, "title": "Ronin" }));
        assert_eq!(card.map(|c| c.id), Some("12".to_string()));
    }

    #[test]
    fn test_malformed_documents_are_skipped() {
        let list = hits(vec![json!({ "title": "no id" }), movie("1")]);
        assert_eq!(cards(Medium::Movie, &list).len(), 1);
    }

    #[test]
    fn test_merge_keeps_overlap_across_lists() {
        let set = merge_suggestions(
            Medium::Movie,
            "42",
            &hits(vec![movie("1"), movie("2")]),
            &hits(vec![movie("2"), movie("3")]),
        );
        let director_ids: Vec<&str> = set.from_director.iter().map(|c| c.id.as_str()).collect();
        let similar_ids: Vec<&str> = set.similar_to.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(director_ids, vec!["1", "2"]);
        assert_eq!(similar_ids, vec!["2", "3"]);
    }

    #[test]
    fn test_merge_excludes_current_item_and_duplicates() {
        let set = merge_suggestions(
            Medium::Movie,
            "42",
            &HitList::empty(),
            &hits(vec![movie("42"), movie("5"), movie("5"), movie("6")]),
        );
        let ids: Vec<&str> = set.similar_to.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["5", "6"]);
    }

    #[test]
    fn test_empty_director_rail_still_returns_similar() {
        let set = merge_suggestions(
            Medium::TvShow,
            "1",
            &HitList::empty(),
            &hits(vec![json!({ "id": "2", "title": "Fargo", "start_year": 2014 })]),
        );
        assert!(!set.has_director_section());
        assert_eq!(set.similar_to.len(), 1);
    }

    #[test]
    fn test_rails_are_capped() {
        let many: Vec<Value> = (0..30).map(|i| movie(&i.to_string())).collect();
        let set = merge_suggestions(Medium::Movie, "999", &hits(many), &HitList::empty());
        assert_eq!(set.from_director.len(), SUGGESTION_PAGE_SIZE as usize);
    }
}
