//! Search engine wire types.
//!
//! Requests serialize to the engine's search parameter names; responses are
//! deserialized leniently since most fields are optional on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::query_builder::{FilterExpression, SortSpec};

/// Vector fields that are never shipped back to callers
pub const EMBEDDING_FIELDS: &str = "user_embedding,item_embedding,embedding";

/// One search against one collection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_by_weights: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_fields: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_fields: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personalization_user_id: Option<String>,
}

impl SearchRequest {
    /// Creates a request against `collection` with embedding fields projected out
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: Some(collection.into()),
            exclude_fields: Some(EMBEDDING_FIELDS.to_string()),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn with_query_by(mut self, fields: impl Into<String>) -> Self {
        self.query_by = Some(fields.into());
        self
    }

    pub fn with_query_by_weights(mut self, weights: impl Into<String>) -> Self {
        self.query_by_weights = Some(weights.into());
        self
    }

    pub fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.filter_by = Some(filter.into_string());
        self
    }

    /// ANDs `filter` onto whatever filter the request already carries
    pub fn and_filter(mut self, filter: FilterExpression) -> Self {
        self.filter_by = Some(match self.filter_by.take() {
            Some(existing) if !existing.trim().is_empty() => {
                FilterExpression::raw(existing).and(filter).into_string()
            }
            _ => filter.into_string(),
        });
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort_by = Some(sort.to_string());
        self
    }

    pub fn with_facet_by(mut self, fields: impl Into<String>) -> Self {
        self.facet_by = Some(fields.into());
        self
    }

    pub fn with_include_fields(mut self, fields: impl Into<String>) -> Self {
        self.include_fields = Some(fields.into());
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = Some(preset.into());
        self
    }

    pub fn with_personalization_user(mut self, user_id: impl Into<String>) -> Self {
        self.personalization_user_id = Some(user_id.into());
        self
    }

    /// Query-string pairs for a single-collection search (the collection goes in the path)
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(value) = value {
                pairs.push((key, value));
            }
        };

        push("q", Some(self.q.clone().unwrap_or_else(|| "*".to_string())));
        push("query_by", self.query_by.clone());
        push("query_by_weights", self.query_by_weights.clone());
        push("filter_by", self.filter_by.clone());
        push("sort_by", self.sort_by.clone());
        push("facet_by", self.facet_by.clone());
        push("include_fields", self.include_fields.clone());
        push("exclude_fields", self.exclude_fields.clone());
        push("per_page", self.per_page.map(|v| v.to_string()));
        push("page", self.page.map(|v| v.to_string()));
        push("preset", self.preset.clone());
        push(
            "personalization_user_id",
            self.personalization_user_id.clone(),
        );

        pairs
    }
}

/// Parameters shared by every search of a multiplexed call
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MultiSearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hit {
    pub document: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_match: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FacetValueCount {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FacetStats {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FacetCount {
    pub field_name: String,
    #[serde(default)]
    pub counts: Vec<FacetValueCount>,
    #[serde(default)]
    pub stats: Option<FacetStats>,
}

/// Response body of a single search
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    #[serde(default)]
    pub found: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub hits: Vec<Hit>,
    #[serde(default)]
    pub facet_counts: Vec<FacetCount>,
}

/// One entry of a multiplexed response; the engine reports failures inline per search
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MultiSearchResult {
    Failed { code: u16, error: String },
    Succeeded(SearchResponse),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MultiSearchResponse {
    #[serde(default)]
    pub results: Vec<MultiSearchResult>,
}

/// Hits of one rail, in engine relevance order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HitList {
    pub hits: Vec<Hit>,
    pub found: u64,
    pub page: u32,
    #[serde(default)]
    pub facet_counts: Vec<FacetCount>,
}

impl HitList {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Value> {
        self.hits.iter().map(|hit| &hit.document)
    }

    pub fn facet(&self, field: &str) -> Option<&FacetCount> {
        self.facet_counts.iter().find(|f| f.field_name == field)
    }
}

impl From<SearchResponse> for HitList {
    fn from(response: SearchResponse) -> Self {
        Self {
            hits: response.hits,
            found: response.found,
            page: response.page,
            facet_counts: response.facet_counts,
        }
    }
}

/// Analytics event forwarded to the engine when a user picks an item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub name: String,
    pub data: ClickData,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClickData {
    pub user_id: String,
    pub doc_id: String,
}

impl AnalyticsEvent {
    pub fn click(medium: crate::models::Medium, user_id: &str, doc_id: &str) -> Self {
        Self {
            event_type: "click".to_string(),
            name: medium.click_event_name(),
            data: ClickData {
                user_id: user_id.to_string(),
                doc_id: doc_id.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Medium;

    #[test]
    fn test_new_request_excludes_embeddings() {
        let request = SearchRequest::new("Movie");
        assert_eq!(request.exclude_fields.as_deref(), Some(EMBEDDING_FIELDS));
    }

    #[test]
    fn test_request_serialization_skips_unset_fields() {
        let request = SearchRequest::new("Movie")
            .with_query("*")
            .with_per_page(15);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["collection"], "Movie");
        assert_eq!(json["per_page"], 15);
        assert!(json.get("filter_by").is_none());
        assert!(json.get("preset").is_none());
    }

    #[test]
    fn test_query_pairs_default_to_wildcard() {
        let pairs = SearchRequest::new("Movie").query_pairs();
        assert!(pairs.contains(&("q", "*".to_string())));
        assert!(!pairs.iter().any(|(key, _)| *key == "collection"));
    }

    #[test]
    fn test_and_filter_combines_existing() {
        let request = SearchRequest::new("Movie")
            .with_filter(FilterExpression::raw("genres:=[Drama]"))
            .and_filter(FilterExpression::raw("release_year:[1990..2000]"));
        assert_eq!(
            request.filter_by.as_deref(),
            Some("genres:=[Drama] && release_year:[1990..2000]")
        );
    }

    #[test]
    fn test_multi_search_result_parses_inline_failure() {
        let json = r#"{"results":[
            {"found":1,"page":1,"hits":[{"document":{"id":"1","title":"Heat"}}]},
            {"code":404,"error":"Not found."}
        ]}"#;
        let response: MultiSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results.len(), 2);
        assert!(matches!(response.results[0], MultiSearchResult::Succeeded(_)));
        assert!(matches!(
            response.results[1],
            MultiSearchResult::Failed { code: 404, .. }
        ));
    }

    #[test]
    fn test_analytics_click_event_shape() {
        let event = AnalyticsEvent::click(Medium::TvShow, "3", "99");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "click");
        assert_eq!(json["name"], "tv_show_click");
        assert_eq!(json["data"]["doc_id"], "99");
    }
}
