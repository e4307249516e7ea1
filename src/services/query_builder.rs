use std::fmt::Display;

use crate::models::{ContentAttributes, Medium, SearchRequest};

/// Page size of every suggestion rail
pub const SUGGESTION_PAGE_SIZE: u32 = 15;

/// Vote count above which a title counts as widely seen
pub const HIGH_VOTE_COUNT: i64 = 10_000;

/// Average rating above which a title counts as acclaimed
pub const STRONG_RATING: f64 = 8.0;

/// Weights of the "similar titles" ranking, highest tier first
pub const GENRE_PAIR_WEIGHT: u32 = 4;
pub const PRIMARY_GENRE_ACCLAIMED_WEIGHT: u32 = 3;
pub const SECONDARY_GENRE_ACCLAIMED_WEIGHT: u32 = 2;

const GENRES_FIELD: &str = "genres";
const PRIMARY_GENRE_FIELD: &str = "primary_genre";
const SECONDARY_GENRE_FIELD: &str = "secondary_genre";
const RATING_FIELD: &str = "average_rating";
const VOTES_FIELD: &str = "num_votes";
const ID_FIELD: &str = "id";

/// Characters that carry meaning in the filter grammar
const RESERVED: &[char] = &[',', ':', '[', ']', '(', ')', '&', '|', '!', '<', '>', '='];

/// Quotes a filter operand with backticks when it contains filter syntax.
///
/// Backticks cannot be escaped inside a quoted operand and are dropped.
pub fn escape_value(value: &str) -> String {
    let cleaned: String = value.chars().filter(|c| *c != '`').collect();
    if cleaned.contains(RESERVED) || cleaned.trim() != cleaned {
        format!("`{}`", cleaned)
    } else {
        cleaned
    }
}

/// Numeric operand; decimals always render with a fractional part (`8.0`, not `8`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Int(i64),
    Decimal(f64),
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Int(value)
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Int(value as i64)
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Decimal(value)
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Int(value) => write!(f, "{}", value),
            Operand::Decimal(value) if value.fract() == 0.0 && value.is_finite() => {
                write!(f, "{:.1}", value)
            }
            Operand::Decimal(value) => write!(f, "{}", value),
        }
    }
}

/// An immutable `filter_by` expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterExpression(String);

impl FilterExpression {
    /// Wraps an already-formed expression verbatim
    pub fn raw(expression: impl Into<String>) -> Self {
        Self(expression.into())
    }

    /// `attr:value`
    pub fn matches(attribute: &str, value: impl Display) -> Self {
        Self(format!("{}:{}", attribute, escape_value(&value.to_string())))
    }

    /// `attr:=value`
    pub fn exact(attribute: &str, value: impl Display) -> Self {
        Self(format!("{}:={}", attribute, escape_value(&value.to_string())))
    }

    /// `attr:!=value`
    pub fn not_equal(attribute: &str, value: impl Display) -> Self {
        Self(format!("{}:!={}", attribute, escape_value(&value.to_string())))
    }

    /// `attr:>n`
    pub fn greater_than(attribute: &str, value: impl Into<Operand>) -> Self {
        Self(format!("{}:>{}", attribute, value.into()))
    }

    /// `attr:<n`
    pub fn less_than(attribute: &str, value: impl Into<Operand>) -> Self {
        Self(format!("{}:<{}", attribute, value.into()))
    }

    /// `attr:>=n`
    pub fn at_least(attribute: &str, value: impl Into<Operand>) -> Self {
        Self(format!("{}:>={}", attribute, value.into()))
    }

    /// `attr:<=n`
    pub fn at_most(attribute: &str, value: impl Into<Operand>) -> Self {
        Self(format!("{}:<={}", attribute, value.into()))
    }

    /// `attr:[min..max]`
    pub fn range(attribute: &str, min: impl Into<Operand>, max: impl Into<Operand>) -> Self {
        Self(format!("{}:[{}..{}]", attribute, min.into(), max.into()))
    }

    /// `attr:[a, b]`, or `None` for an empty set
    pub fn any_of<S: AsRef<str>>(attribute: &str, values: &[S]) -> Option<Self> {
        Self::set(attribute, ":", values)
    }

    /// `attr:=[a, b]`, or `None` for an empty set
    pub fn exact_any_of<S: AsRef<str>>(attribute: &str, values: &[S]) -> Option<Self> {
        Self::set(attribute, ":=", values)
    }

    fn set<S: AsRef<str>>(attribute: &str, operator: &str, values: &[S]) -> Option<Self> {
        let members: Vec<String> = values
            .iter()
            .map(|value| value.as_ref().trim())
            .filter(|value| !value.is_empty())
            .map(escape_value)
            .collect();
        if members.is_empty() {
            return None;
        }
        Some(Self(format!(
            "{}{}[{}]",
            attribute,
            operator,
            members.join(", ")
        )))
    }

    /// `$Relation(inner)`
    pub fn join(relation: &str, inner: FilterExpression) -> Self {
        Self(format!("{}({})", relation, inner.0))
    }

    pub fn and(self, other: FilterExpression) -> Self {
        Self(format!("{} && {}", self.0, other.0))
    }

    pub fn or(self, other: FilterExpression) -> Self {
        Self(format!("{} || {}", self.0, other.0))
    }

    pub fn grouped(self) -> Self {
        Self(format!("({})", self.0))
    }

    /// ANDs every expression together; `None` when there are none
    pub fn all(expressions: impl IntoIterator<Item = FilterExpression>) -> Option<Self> {
        expressions.into_iter().reduce(FilterExpression::and)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for FilterExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringTier {
    pub predicate: FilterExpression,
    pub weight: u32,
}

/// Weighted predicates the engine evaluates per document; a document scores the
/// highest weight among the predicates it matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringExpression {
    tiers: Vec<ScoringTier>,
}

impl ScoringExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier(mut self, predicate: FilterExpression, weight: u32) -> Self {
        self.tiers.push(ScoringTier { predicate, weight });
        self
    }

    pub fn tiers(&self) -> &[ScoringTier] {
        &self.tiers
    }

    pub fn weights(&self) -> Vec<u32> {
        self.tiers.iter().map(|tier| tier.weight).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl Display for ScoringExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tiers: Vec<String> = self
            .tiers
            .iter()
            .map(|tier| format!("({}):{}", tier.predicate, tier.weight))
            .collect();
        write!(f, "_eval([{}])", tiers.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("asc"),
            SortOrder::Desc => f.write_str("desc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortClause {
    Field(String, SortOrder),
    Eval(ScoringExpression, SortOrder),
    TextMatch(SortOrder),
}

impl Display for SortClause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortClause::Field(field, order) => write!(f, "{}:{}", field, order),
            SortClause::Eval(expression, order) => write!(f, "{}:{}", expression, order),
            SortClause::TextMatch(order) => write!(f, "_text_match:{}", order),
        }
    }
}

/// Ordered `sort_by` clauses, primary first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortSpec {
    clauses: Vec<SortClause>,
}

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_desc(mut self, field: &str) -> Self {
        self.clauses
            .push(SortClause::Field(field.to_string(), SortOrder::Desc));
        self
    }

    pub fn then_asc(mut self, field: &str) -> Self {
        self.clauses
            .push(SortClause::Field(field.to_string(), SortOrder::Asc));
        self
    }

    /// Adds a scoring expression; empty expressions are skipped
    pub fn then_eval(mut self, expression: ScoringExpression) -> Self {
        if !expression.is_empty() {
            self.clauses
                .push(SortClause::Eval(expression, SortOrder::Desc));
        }
        self
    }

    pub fn then_text_match(mut self) -> Self {
        self.clauses.push(SortClause::TextMatch(SortOrder::Desc));
        self
    }

    pub fn clauses(&self) -> &[SortClause] {
        &self.clauses
    }

    pub fn scoring(&self) -> Option<&ScoringExpression> {
        self.clauses.iter().find_map(|clause| match clause {
            SortClause::Eval(expression, _) => Some(expression),
            _ => None,
        })
    }
}

impl Display for SortSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clauses: Vec<String> = self.clauses.iter().map(ToString::to_string).collect();
        f.write_str(&clauses.join(", "))
    }
}

/// The two queries behind an item's "more like this" section
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionQueries {
    /// `None` when the item has no credited director
    pub from_director: Option<SearchRequest>,
    pub similar_to: SearchRequest,
}

/// Builds both suggestion queries for an item
pub fn build_suggestion_queries(
    medium: Medium,
    item_id: &str,
    director_id: Option<i64>,
    genres: &[&str],
) -> SuggestionQueries {
    let from_director = director_id.map(|director_id| {
        SearchRequest::new(medium.collection())
            .with_query("*")
            .with_filter(from_director_filter(medium, director_id, item_id))
            .with_sort(from_director_sort(medium))
            .with_per_page(SUGGESTION_PAGE_SIZE)
    });

    let similar_to = SearchRequest::new(medium.collection())
        .with_query("*")
        .with_filter(similar_to_filter(item_id, genres))
        .with_sort(similar_to_sort(genres))
        .with_per_page(SUGGESTION_PAGE_SIZE);

    SuggestionQueries {
        from_director,
        similar_to,
    }
}

/// Builds the suggestion queries from any movie or show, using its first director
pub fn suggestion_queries_for(item: &impl ContentAttributes) -> SuggestionQueries {
    build_suggestion_queries(
        item.collection_type(),
        item.id(),
        item.director_ids().first().copied(),
        &item.genres(),
    )
}

/// `$<Medium>Director(person_id:<id>) && id:!=<item>`
pub fn from_director_filter(medium: Medium, director_id: i64, item_id: &str) -> FilterExpression {
    FilterExpression::join(
        medium.director_relation(),
        FilterExpression::matches("person_id", director_id),
    )
    .and(exclude_item(item_id))
}

pub fn from_director_sort(medium: Medium) -> SortSpec {
    SortSpec::new()
        .then_desc(RATING_FIELD)
        .then_desc(VOTES_FIELD)
        .then_desc(medium.year_field())
}

/// `genres:[...] && id:!=<item>`; the genre clause is left out when there are no genres
pub fn similar_to_filter(item_id: &str, genres: &[&str]) -> FilterExpression {
    match FilterExpression::any_of(GENRES_FIELD, genres) {
        Some(genre_clause) => genre_clause.and(exclude_item(item_id)),
        None => exclude_item(item_id),
    }
}

pub fn similar_to_sort(genres: &[&str]) -> SortSpec {
    SortSpec::new()
        .then_eval(similar_to_scoring(genres))
        .then_desc(RATING_FIELD)
        .then_desc(VOTES_FIELD)
}

/// Multi-tier ranking for "similar titles", selected by how many genres the item has
pub fn similar_to_scoring(genres: &[&str]) -> ScoringExpression {
    match genres {
        [] => ScoringExpression::new(),
        [primary] => ScoringExpression::new().tier(
            acclaimed()
                .and(widely_seen())
                .and(FilterExpression::matches(PRIMARY_GENRE_FIELD, primary)),
            PRIMARY_GENRE_ACCLAIMED_WEIGHT,
        ),
        [primary, secondary, ..] => ScoringExpression::new()
            .tier(
                genre_pair(primary, secondary).and(widely_seen()),
                GENRE_PAIR_WEIGHT,
            )
            .tier(
                genre_pair(secondary, primary).and(widely_seen()),
                GENRE_PAIR_WEIGHT,
            )
            .tier(
                acclaimed()
                    .and(widely_seen())
                    .and(FilterExpression::matches(PRIMARY_GENRE_FIELD, primary)),
                PRIMARY_GENRE_ACCLAIMED_WEIGHT,
            )
            .tier(
                acclaimed().and(FilterExpression::matches(SECONDARY_GENRE_FIELD, secondary)),
                SECONDARY_GENRE_ACCLAIMED_WEIGHT,
            ),
    }
}

fn genre_pair(primary: &str, secondary: &str) -> FilterExpression {
    FilterExpression::matches(PRIMARY_GENRE_FIELD, primary)
        .and(FilterExpression::matches(SECONDARY_GENRE_FIELD, secondary))
}

fn acclaimed() -> FilterExpression {
    FilterExpression::greater_than(RATING_FIELD, STRONG_RATING)
}

fn widely_seen() -> FilterExpression {
    FilterExpression::greater_than(VOTES_FIELD, HIGH_VOTE_COUNT)
}

fn exclude_item(item_id: &str) -> FilterExpression {
    FilterExpression::not_equal(ID_FIELD, item_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights_non_increasing(weights: &[u32]) -> bool {
        weights.windows(2).all(|pair| pair[0] >= pair[1])
    }

    #[test]
    fn test_escape_value_plain() {
        assert_eq!(escape_value("Action"), "Action");
        assert_eq!(escape_value("Science Fiction"), "Science Fiction");
    }

    #[test]
    fn test_escape_value_reserved_characters() {
        assert_eq!(escape_value("Sci-Fi, Horror"), "`Sci-Fi, Horror`");
        assert_eq!(escape_value("Mission: Impossible"), "`Mission: Impossible`");
        assert_eq!(escape_value("a`b"), "ab");
    }

    #[test]
    fn test_operand_formatting() {
        assert_eq!(Operand::from(8.0).to_string(), "8.0");
        assert_eq!(Operand::from(7.5).to_string(), "7.5");
        assert_eq!(Operand::from(10_000i64).to_string(), "10000");
    }

    #[test]
    fn test_filter_set_and_range() {
        assert_eq!(
            FilterExpression::any_of("genres", &["Action", "Drama"])
                .unwrap()
                .as_str(),
            "genres:[Action, Drama]"
        );
        assert!(FilterExpression::any_of::<&str>("genres", &[]).is_none());
        assert!(FilterExpression::any_of("genres", &["", "  "]).is_none());
        assert_eq!(
            FilterExpression::range("release_year", 1990, 2000).as_str(),
            "release_year:[1990..2000]"
        );
    }

    #[test]
    fn test_filter_all() {
        let combined = FilterExpression::all(vec![
            FilterExpression::raw("a:1"),
            FilterExpression::raw("b:2"),
        ])
        .unwrap();
        assert_eq!(combined.as_str(), "a:1 && b:2");
        assert!(FilterExpression::all(Vec::new()).is_none());
    }

    #[test]
    fn test_from_director_query() {
        let queries = build_suggestion_queries(Medium::Movie, "42", Some(77), &["Crime"]);
        let request = queries.from_director.unwrap();
        assert_eq!(
            request.filter_by.as_deref(),
            Some("$MovieDirector(person_id:77) && id:!=42")
        );
        assert_eq!(
            request.sort_by.as_deref(),
            Some("average_rating:desc, num_votes:desc, release_year:desc")
        );
        assert_eq!(request.per_page, Some(SUGGESTION_PAGE_SIZE));
        assert_eq!(request.collection.as_deref(), Some("Movie"));
    }

    #[test]
    fn test_from_director_query_for_tv_shows_uses_start_year() {
        let queries = build_suggestion_queries(Medium::TvShow, "8", Some(3), &[]);
        let request = queries.from_director.unwrap();
        assert!(request
            .filter_by
            .as_deref()
            .unwrap()
            .starts_with("$TvShowDirector(person_id:3)"));
        assert!(request.sort_by.as_deref().unwrap().ends_with("start_year:desc"));
    }

    #[test]
    fn test_missing_director_yields_no_director_query() {
        let queries = build_suggestion_queries(Medium::Movie, "42", None, &["Drama"]);
        assert!(queries.from_director.is_none());
    }

    #[test]
    fn test_similar_to_two_genres() {
        let queries = build_suggestion_queries(Medium::Movie, "42", Some(1), &["Crime", "Drama"]);
        let request = queries.similar_to;
        assert_eq!(
            request.filter_by.as_deref(),
            Some("genres:[Crime, Drama] && id:!=42")
        );
        assert_eq!(
            request.sort_by.as_deref(),
            Some(
                "_eval([\
                (primary_genre:Crime && secondary_genre:Drama && num_votes:>10000):4, \
                (primary_genre:Drama && secondary_genre:Crime && num_votes:>10000):4, \
                (average_rating:>8.0 && num_votes:>10000 && primary_genre:Crime):3, \
                (average_rating:>8.0 && secondary_genre:Drama):2\
                ]):desc, average_rating:desc, num_votes:desc"
            )
        );
    }

    #[test]
    fn test_similar_to_scoring_tiers_by_genre_count() {
        assert!(similar_to_scoring(&[]).is_empty());

        let single = similar_to_scoring(&["Drama"]);
        assert_eq!(single.weights(), vec![PRIMARY_GENRE_ACCLAIMED_WEIGHT]);

        let pair = similar_to_scoring(&["Crime", "Drama"]);
        assert_eq!(pair.weights(), vec![4, 4, 3, 2]);
        assert!(weights_non_increasing(&pair.weights()));

        // extra genres only widen the filter, never the scoring
        let triple = similar_to_scoring(&["Crime", "Drama", "Thriller"]);
        assert_eq!(triple, pair);
    }

    #[test]
    fn test_tier_weights_strictly_ordered() {
        assert!(GENRE_PAIR_WEIGHT > PRIMARY_GENRE_ACCLAIMED_WEIGHT);
        assert!(PRIMARY_GENRE_ACCLAIMED_WEIGHT > SECONDARY_GENRE_ACCLAIMED_WEIGHT);
    }

    #[test]
    fn test_similar_to_single_genre_sort() {
        let sort = similar_to_sort(&["Drama"]).to_string();
        assert_eq!(
            sort,
            "_eval([(average_rating:>8.0 && num_votes:>10000 && primary_genre:Drama):3]):desc, \
             average_rating:desc, num_votes:desc"
        );
    }

    #[test]
    fn test_similar_to_without_genres_skips_genre_clause() {
        let queries = build_suggestion_queries(Medium::Movie, "42", None, &[]);
        assert_eq!(queries.similar_to.filter_by.as_deref(), Some("id:!=42"));
        assert_eq!(
            queries.similar_to.sort_by.as_deref(),
            Some("average_rating:desc, num_votes:desc")
        );
    }

    #[test]
    fn test_every_suggestion_filter_excludes_item() {
        for genres in [vec![], vec!["Drama"], vec!["Crime", "Drama"]] {
            let queries = build_suggestion_queries(Medium::TvShow, "314", Some(5), &genres);
            for request in [queries.from_director.unwrap(), queries.similar_to] {
                assert!(request.filter_by.unwrap().contains("id:!=314"));
            }
        }
    }

    #[test]
    fn test_genres_with_reserved_characters_are_quoted() {
        let filter = similar_to_filter("1", &["Action & Adventure", "Drama"]);
        assert_eq!(
            filter.as_str(),
            "genres:[`Action & Adventure`, Drama] && id:!=1"
        );
    }
}
