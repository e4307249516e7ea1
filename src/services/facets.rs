/// Facet and refinement state
///
/// Maps the browse section's facet selections to and from two representations:
/// the engine's `filter_by`/`sort_by` parameters and the instant-search deep-link
/// query string (`<index>[refinementList][<field>][<n>]=<value>`).
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    models::{FacetStats, HitList, Medium, SearchRequest},
    services::query_builder::{FilterExpression, Operand},
};

/// Fields searched by the browse rail and their relative weights
pub const BROWSE_QUERY_BY: &str = "title,description";
pub const BROWSE_QUERY_BY_WEIGHTS: &str = "10,1";

/// A refinement list shown in the filter panel
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RefinementFacet {
    pub attribute: &'static str,
    /// Mounted (so deep links still apply) but not displayed
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AttributeLabel {
    pub attribute: &'static str,
    pub label: &'static str,
}

/// Facets offered by a medium's browse section
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FacetLayout {
    pub index_id: String,
    pub refinements: Vec<RefinementFacet>,
    pub ranges: Vec<&'static str>,
    pub labels: Vec<AttributeLabel>,
}

impl FacetLayout {
    pub fn for_medium(medium: Medium) -> Self {
        let label = |attribute, label| AttributeLabel { attribute, label };
        let facet = |attribute, hidden| RefinementFacet { attribute, hidden };

        match medium {
            Medium::Movie => Self {
                index_id: medium.browse_index_id(),
                refinements: vec![
                    facet("genres", false),
                    facet("directors", true),
                    facet("countries", false),
                ],
                ranges: vec!["release_year", "average_rating"],
                labels: vec![
                    label("genres", "Genre"),
                    label("release_year", "Release Year"),
                    label("average_rating", "Rating"),
                    label("directors", "Director"),
                    label("countries", "Country"),
                ],
            },
            Medium::TvShow => Self {
                index_id: medium.browse_index_id(),
                refinements: vec![
                    facet("genres", true),
                    facet("directors", false),
                    facet("countries", false),
                ],
                ranges: vec!["start_year", "average_rating"],
                labels: vec![
                    label("genres", "Genre"),
                    label("start_year", "First Aired"),
                    label("end_year", "Last Aired"),
                    label("average_rating", "Rating"),
                    label("directors", "Director"),
                    label("countries", "Country"),
                ],
            },
        }
    }

    /// Display label, falling back to the attribute name with each word capitalised
    pub fn label_for(&self, attribute: &str) -> String {
        self.labels
            .iter()
            .find(|label| label.attribute == attribute)
            .map(|label| label.label.to_string())
            .unwrap_or_else(|| capitalize_words(attribute))
    }

    pub fn is_refinement(&self, attribute: &str) -> bool {
        self.refinements.iter().any(|facet| facet.attribute == attribute)
    }

    pub fn is_range(&self, attribute: &str) -> bool {
        self.ranges.iter().any(|range| *range == attribute)
    }

    /// `facet_by` parameter covering every refinement list and range
    pub fn facet_by(&self) -> String {
        self.refinements
            .iter()
            .map(|facet| facet.attribute)
            .chain(self.ranges.iter().copied())
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn capitalize_words(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders a bound as an integer operand when it has no fractional part
fn bound_operand(value: f64) -> Operand {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Operand::Int(value as i64)
    } else {
        Operand::Decimal(value)
    }
}

fn format_bound(value: f64) -> String {
    bound_operand(value).to_string()
}

/// Either end may be open
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RangeBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeBounds {
    /// Parses `min:max`, where either side may be empty
    pub fn parse(value: &str) -> Option<Self> {
        let (min, max) = value.split_once(':')?;
        let parse_side = |side: &str| -> Option<Option<f64>> {
            let side = side.trim();
            if side.is_empty() {
                Some(None)
            } else {
                side.parse::<f64>().ok().filter(|v| v.is_finite()).map(Some)
            }
        };
        let bounds = Self {
            min: parse_side(min)?,
            max: parse_side(max)?,
        };
        (bounds.min.is_some() || bounds.max.is_some()).then_some(bounds)
    }

    fn to_filter(self, attribute: &str) -> Option<FilterExpression> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some(FilterExpression::range(
                attribute,
                bound_operand(min.min(max)),
                bound_operand(min.max(max)),
            )),
            (Some(min), None) => Some(FilterExpression::at_least(attribute, bound_operand(min))),
            (None, Some(max)) => Some(FilterExpression::at_most(attribute, bound_operand(max))),
            (None, None) => None,
        }
    }
}

impl std::fmt::Display for RangeBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            self.min.map(format_bound).unwrap_or_default(),
            self.max.map(format_bound).unwrap_or_default()
        )
    }
}

/// One removable chip of the current-refinements bar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefinementChip {
    pub attribute: String,
    pub label: String,
    pub value: String,
}

/// Active selections of one browse session
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RefinementState {
    pub query: Option<String>,
    pub refinements: BTreeMap<String, Vec<String>>,
    pub ranges: BTreeMap<String, RangeBounds>,
    /// Instant-search sort index, `<collection>/sort/<sort_by>`
    pub sort_by: Option<String>,
    /// 1-based
    pub page: Option<u32>,
}

impl RefinementState {
    /// Restores state from decoded deep-link pairs.
    ///
    /// Keys for other indices and attributes the layout does not offer are ignored.
    pub fn from_pairs<K, V>(layout: &FacetLayout, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut state = Self::default();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            let Some(segments) = index_segments(&layout.index_id, key) else {
                continue;
            };

            match segments.as_slice() {
                ["refinementList", attribute, _] if layout.is_refinement(attribute) => {
                    let value = value.trim();
                    if value.is_empty() {
                        continue;
                    }
                    let values = state.refinements.entry(attribute.to_string()).or_default();
                    if !values.iter().any(|existing| existing == value) {
                        values.push(value.to_string());
                    }
                }
                ["range", attribute] if layout.is_range(attribute) => {
                    if let Some(bounds) = RangeBounds::parse(value) {
                        state.ranges.insert(attribute.to_string(), bounds);
                    }
                }
                ["query"] => {
                    let query = value.trim();
                    if !query.is_empty() {
                        state.query = Some(query.to_string());
                    }
                }
                ["sortBy"] => {
                    if sort_clause(value).is_some() {
                        state.sort_by = Some(value.to_string());
                    }
                }
                ["page"] => {
                    state.page = value.parse::<u32>().ok().filter(|page| *page > 0);
                }
                _ => {
                    tracing::debug!(key = %key, "Ignoring unsupported refinement parameter");
                }
            }
        }

        state
    }

    /// Restores state from a raw (still percent-encoded) query string
    pub fn from_query_string(layout: &FacetLayout, query: &str) -> Self {
        Self::from_pairs(layout, parse_query_string(query))
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_none()
            && self.refinements.is_empty()
            && self.ranges.is_empty()
            && self.sort_by.is_none()
    }

    /// ANDs every refinement list (exact match, any of) and range
    pub fn to_filter_expression(&self) -> Option<FilterExpression> {
        let lists = self
            .refinements
            .iter()
            .filter_map(|(attribute, values)| FilterExpression::exact_any_of(attribute, values));
        let ranges = self
            .ranges
            .iter()
            .filter_map(|(attribute, bounds)| bounds.to_filter(attribute));

        FilterExpression::all(lists.chain(ranges))
    }

    /// Browse request for this state on top of the medium's base parameters
    pub fn to_search_request(
        &self,
        medium: Medium,
        layout: &FacetLayout,
        per_page: u32,
    ) -> SearchRequest {
        let mut request = browse_base_request(medium)
            .with_query(self.query.clone().unwrap_or_else(|| "*".to_string()))
            .with_facet_by(layout.facet_by())
            .with_per_page(per_page)
            .with_page(self.page.unwrap_or(1));

        if let Some(filter) = self.to_filter_expression() {
            request = request.with_filter(filter);
        }
        if let Some(sort) = self.sort_by.as_deref().and_then(sort_clause) {
            request.sort_by = Some(sort.to_string());
        }

        request
    }

    /// Deep-link query string for this state, keys in a stable order
    pub fn to_query_string(&self, index_id: &str) -> String {
        let mut params = Vec::new();

        if let Some(query) = &self.query {
            params.push((format!("{}[query]", index_id), query.clone()));
        }
        for (attribute, values) in &self.refinements {
            for (position, value) in values.iter().enumerate() {
                params.push((
                    format!("{}[refinementList][{}][{}]", index_id, attribute, position),
                    value.clone(),
                ));
            }
        }
        for (attribute, bounds) in &self.ranges {
            params.push((
                format!("{}[range][{}]", index_id, attribute),
                bounds.to_string(),
            ));
        }
        if let Some(sort_by) = &self.sort_by {
            params.push((format!("{}[sortBy]", index_id), sort_by.clone()));
        }
        if let Some(page) = self.page.filter(|page| *page > 1) {
            params.push((format!("{}[page]", index_id), page.to_string()));
        }

        encode_pairs(&params)
    }

    /// Chips for the current-refinements bar, ordered by label
    pub fn current_refinements(&self, layout: &FacetLayout) -> Vec<RefinementChip> {
        let mut chips = Vec::new();

        for (attribute, values) in &self.refinements {
            for value in values {
                chips.push(RefinementChip {
                    attribute: attribute.clone(),
                    label: layout.label_for(attribute),
                    value: value.clone(),
                });
            }
        }
        for (attribute, bounds) in &self.ranges {
            let label = layout.label_for(attribute);
            if let Some(min) = bounds.min {
                chips.push(RefinementChip {
                    attribute: attribute.clone(),
                    label: label.clone(),
                    value: format!("≥ {}", format_bound(min)),
                });
            }
            if let Some(max) = bounds.max {
                chips.push(RefinementChip {
                    attribute: attribute.clone(),
                    label: label.clone(),
                    value: format!("≤ {}", format_bound(max)),
                });
            }
        }

        chips.sort_by(|a, b| a.label.cmp(&b.label));
        chips
    }
}

/// Base parameters of a medium's browse rail
pub fn browse_base_request(medium: Medium) -> SearchRequest {
    SearchRequest::new(medium.collection())
        .with_query_by(BROWSE_QUERY_BY)
        .with_query_by_weights(BROWSE_QUERY_BY_WEIGHTS)
}

/// Sort clause of an instant-search sort index (`<collection>/sort/<field>:<order>`)
fn sort_clause(sort_index: &str) -> Option<&str> {
    let (_, clause) = sort_index.split_once("/sort/")?;
    let (field, order) = clause.split_once(':')?;
    let sortable = field
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    (sortable && !field.is_empty() && matches!(order, "asc" | "desc")).then_some(clause)
}

/// Splits `[a][b][c]` following `index_id` into its segments
fn index_segments<'a>(index_id: &str, key: &'a str) -> Option<Vec<&'a str>> {
    let rest = key.strip_prefix(index_id)?;
    let inner = rest.strip_prefix('[')?.strip_suffix(']')?;
    Some(inner.split("][").collect())
}

/// Decodes `a=1&b=2` into pairs, treating `+` as a space
pub fn parse_query_string(query: &str) -> Vec<(String, String)> {
    let decode = |part: &str| {
        let part = part.replace('+', " ");
        urlencoding::decode(&part)
            .map(|decoded| decoded.into_owned())
            .unwrap_or(part)
    };

    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode(key), decode(value)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

/// Encodes values; keys keep their brackets literal, matching instant-search links
fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Observed min/max of a range facet from a browse response
pub fn range_stats(hits: &HitList, attribute: &str) -> FacetStats {
    hits.facet(attribute)
        .and_then(|facet| facet.stats.clone())
        .unwrap_or_default()
}

/// Inputs of [`url_builder`]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LinkParams {
    pub index_name: String,
    /// A single `field:value` token, e.g. `genres:[Action]`
    pub filter_by: Option<String>,
    pub section_id: Option<String>,
}

/// Deep link into a browse section pre-refined to one facet value.
///
/// `url_builder("movies", genres:[Action] in all-movies)` yields
/// `/movies?all-movies[refinementList][genres][0]=Action#all-movies`.
/// An empty or unparseable token yields the bare route (plus anchor).
pub fn url_builder(route: &str, params: &LinkParams) -> String {
    let mut url = format!("/{}", route);

    if let Some((field, value)) = params.filter_by.as_deref().and_then(parse_link_token) {
        url.push('?');
        url.push_str(&encode_pairs(&[(
            format!("{}[refinementList][{}][0]", params.index_name, field),
            value,
        )]));
    }

    if let Some(section_id) = params.section_id.as_deref().filter(|id| !id.is_empty()) {
        url.push('#');
        url.push_str(section_id);
    }

    url
}

fn parse_link_token(token: &str) -> Option<(&str, String)> {
    let (field, value) = token.split_once(':')?;
    let field = field.trim();
    let value = value.trim();
    let value = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .unwrap_or(value);
    let value = value
        .strip_prefix('`')
        .and_then(|v| v.strip_suffix('`'))
        .unwrap_or(value);

    (!field.is_empty() && !value.is_empty()).then(|| (field, value.to_string()))
}

/// Deep link for one facet value of an item's medium
pub fn facet_link(medium: Medium, attribute: &str, value: &str) -> String {
    let index_id = medium.browse_index_id();
    url_builder(
        medium.route(),
        &LinkParams {
            index_name: index_id.clone(),
            filter_by: Some(format!("{}:[{}]", attribute, value)),
            section_id: Some(index_id),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie_layout() -> FacetLayout {
        FacetLayout::for_medium(Medium::Movie)
    }

    #[test]
    fn test_url_builder_genre_link() {
        let url = url_builder(
            "movies",
            &LinkParams {
                index_name: "all-movies".to_string(),
                filter_by: Some("genres:[Action]".to_string()),
                section_id: Some("all-movies".to_string()),
            },
        );
        assert_eq!(url, "/movies?all-movies[refinementList][genres][0]=Action#all-movies");
    }

    #[test]
    fn test_url_builder_strips_backticks_and_encodes() {
        let url = url_builder(
            "tv_shows",
            &LinkParams {
                index_name: "all-tv_shows".to_string(),
                filter_by: Some("directors:[`Lynch, David`]".to_string()),
                section_id: None,
            },
        );
        assert_eq!(
            url,
            "/tv_shows?all-tv_shows[refinementList][directors][0]=Lynch%2C%20David"
        );
    }

    #[test]
    fn test_url_builder_empty_value_yields_base_url() {
        let params = LinkParams {
            index_name: "all-movies".to_string(),
            filter_by: Some("genres:".to_string()),
            section_id: Some("all-movies".to_string()),
        };
        assert_eq!(url_builder("movies", &params), "/movies#all-movies");

        let params = LinkParams {
            index_name: "all-movies".to_string(),
            filter_by: Some("nonsense".to_string()),
            section_id: None,
        };
        assert_eq!(url_builder("movies", &params), "/movies");
    }

    #[test]
    fn test_url_builder_keeps_colons_in_value() {
        let url = url_builder(
            "movies",
            &LinkParams {
                index_name: "all-movies".to_string(),
                filter_by: Some("countries:[Korea: South]".to_string()),
                section_id: None,
            },
        );
        assert_eq!(
            url,
            "/movies?all-movies[refinementList][countries][0]=Korea%3A%20South"
        );
    }

    #[test]
    fn test_deep_link_restores_state() {
        let state = RefinementState::from_query_string(
            &movie_layout(),
            "all-movies%5BrefinementList%5D%5Bgenres%5D%5B0%5D=Action\
             &all-movies[refinementList][genres][1]=Science+Fiction\
             &all-movies[range][release_year]=1990:2000\
             &all-movies[query]=heat\
             &all-movies[page]=2",
        );

        assert_eq!(
            state.refinements.get("genres"),
            Some(&vec!["Action".to_string(), "Science Fiction".to_string()])
        );
        assert_eq!(
            state.ranges.get("release_year"),
            Some(&RangeBounds {
                min: Some(1990.0),
                max: Some(2000.0)
            })
        );
        assert_eq!(state.query.as_deref(), Some("heat"));
        assert_eq!(state.page, Some(2));
    }

    #[test]
    fn test_unknown_attributes_and_indices_are_ignored() {
        let state = RefinementState::from_pairs(
            &movie_layout(),
            vec![
                ("all-movies[refinementList][id][0]", "1 || id:>0"),
                ("all-tv_shows[refinementList][genres][0]", "Drama"),
                ("all-movies[range][start_year]", "1990:2000"),
                ("utm_source", "newsletter"),
            ],
        );
        assert!(state.is_empty());
    }

    #[test]
    fn test_filter_expression_from_state() {
        let state = RefinementState::from_pairs(
            &movie_layout(),
            vec![
                ("all-movies[refinementList][genres][0]", "Action"),
                ("all-movies[refinementList][genres][1]", "Sci-Fi & Fantasy"),
                ("all-movies[refinementList][countries][0]", "France"),
                ("all-movies[range][average_rating]", "7.5:"),
                ("all-movies[range][release_year]", "2000:1990"),
            ],
        );

        let filter = state.to_filter_expression().unwrap();
        assert_eq!(
            filter.as_str(),
            "countries:=[France] && genres:=[Action, `Sci-Fi & Fantasy`] \
             && average_rating:>=7.5 && release_year:[1990..2000]"
        );
    }

    #[test]
    fn test_search_request_from_state() {
        let layout = movie_layout();
        let state = RefinementState::from_pairs(
            &layout,
            vec![
                ("all-movies[sortBy]", "Movie/sort/average_rating:desc"),
                ("all-movies[refinementList][genres][0]", "Drama"),
            ],
        );
        let request = state.to_search_request(Medium::Movie, &layout, 12);

        assert_eq!(request.collection.as_deref(), Some("Movie"));
        assert_eq!(request.q.as_deref(), Some("*"));
        assert_eq!(request.query_by.as_deref(), Some("title,description"));
        assert_eq!(request.query_by_weights.as_deref(), Some("10,1"));
        assert_eq!(request.filter_by.as_deref(), Some("genres:=[Drama]"));
        assert_eq!(request.sort_by.as_deref(), Some("average_rating:desc"));
        assert_eq!(request.per_page, Some(12));
        assert_eq!(request.page, Some(1));
        assert_eq!(
            request.facet_by.as_deref(),
            Some("genres,directors,countries,release_year,average_rating")
        );
    }

    #[test]
    fn test_malformed_sort_index_is_ignored() {
        let state = RefinementState::from_pairs(
            &movie_layout(),
            vec![("all-movies[sortBy]", "Movie/sort/_eval([(id:>0):9]):desc")],
        );
        assert_eq!(state.sort_by, None);
    }

    #[test]
    fn test_query_string_round_trip() {
        let layout = movie_layout();
        let original = RefinementState::from_pairs(
            &layout,
            vec![
                ("all-movies[refinementList][genres][0]", "Action"),
                ("all-movies[refinementList][countries][0]", "Côte d'Ivoire"),
                ("all-movies[range][release_year]", "1990:2000"),
                ("all-movies[query]", "the heat"),
            ],
        );

        let encoded = original.to_query_string("all-movies");
        let restored = RefinementState::from_query_string(&layout, &encoded);
        assert_eq!(restored, original);
    }

    #[test]
    fn test_current_refinements_sorted_with_labels() {
        let layout = FacetLayout::for_medium(Medium::TvShow);
        let state = RefinementState::from_pairs(
            &layout,
            vec![
                ("all-tv_shows[refinementList][genres][0]", "Drama"),
                ("all-tv_shows[refinementList][countries][0]", "Japan"),
                ("all-tv_shows[range][start_year]", ":2010"),
            ],
        );

        let chips = state.current_refinements(&layout);
        let labels: Vec<(&str, &str)> = chips
            .iter()
            .map(|chip| (chip.label.as_str(), chip.value.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![("Country", "Japan"), ("First Aired", "≤ 2010"), ("Genre", "Drama")]
        );
    }

    #[test]
    fn test_label_falls_back_to_capitalized_attribute() {
        assert_eq!(movie_layout().label_for("content rating"), "Content Rating");
        assert_eq!(movie_layout().label_for("genres"), "Genre");
    }

    #[test]
    fn test_facet_link_for_director() {
        assert_eq!(
            facet_link(Medium::TvShow, "directors", "Vince Gilligan"),
            "/tv_shows?all-tv_shows[refinementList][directors][0]=Vince%20Gilligan#all-tv_shows"
        );
    }
}
