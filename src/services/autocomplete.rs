/// Autocomplete
///
/// The multiplexed search behind the header search box, and the session state machine
/// that drives it. The session is pure: callers feed it UI events and engine responses
/// and carry out the returned effects (issue a search, navigate, record a click).
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    models::{AnalyticsEvent, HitList, Medium, MultiSearchParams, SearchRequest},
    services::{
        aggregator::{cards, MediaCard},
        gateway::{execute_multiplexed, SearchGateway},
        query_builder::SortSpec,
    },
};

pub const AUTOCOMPLETE_PER_PAGE: u32 = 5;

/// How long a blurred box stays open so a click on a result can land
pub const BLUR_GRACE: Duration = Duration::from_millis(100);

const MOVIE_FIELDS: &str = "id,title,primary_image_url,release_year,average_rating,collection_type";
const TV_SHOW_FIELDS: &str =
    "id,title,primary_image_url,start_year,end_year,average_rating,genre_names,collection_type";
const QUERY_BY: &str = "title,description";

/// Trimmed input, or the wildcard when nothing was typed
pub fn normalize_query(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        "*".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Movies, shows and popular queries, in that order
pub fn autocomplete_searches(
    q: &str,
    popular_collection: &str,
) -> (Vec<SearchRequest>, MultiSearchParams) {
    let by_relevance = SortSpec::new().then_text_match().then_desc("average_rating");

    let searches = vec![
        SearchRequest::new(Medium::Movie.collection())
            .with_include_fields(MOVIE_FIELDS)
            .with_query_by(QUERY_BY)
            .with_sort(by_relevance.clone()),
        SearchRequest::new(Medium::TvShow.collection())
            .with_include_fields(TV_SHOW_FIELDS)
            .with_query_by(QUERY_BY)
            .with_sort(by_relevance),
        SearchRequest::new(popular_collection)
            .with_query_by("q")
            .with_sort(SortSpec::new().then_desc("count")),
    ];

    let common = MultiSearchParams {
        q: Some(normalize_query(q)),
        per_page: Some(AUTOCOMPLETE_PER_PAGE),
    };

    (searches, common)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopularQuery {
    pub q: String,
    #[serde(default)]
    pub count: u64,
}

/// Popular queries worth suggesting; the wildcard and blank queries are dropped
pub fn popular_queries(hits: &HitList) -> Vec<PopularQuery> {
    hits.documents()
        .filter_map(|document| serde_json::from_value::<PopularQuery>(document.clone()).ok())
        .filter(|query| query.q != "*" && !query.q.trim().is_empty())
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AutocompleteResults {
    pub movies: Vec<MediaCard>,
    pub tv_shows: Vec<MediaCard>,
    pub popular_queries: Vec<PopularQuery>,
}

impl AutocompleteResults {
    /// Builds results from the three rails in search order; missing rails are empty
    pub fn from_lists(lists: Vec<HitList>) -> Self {
        let mut lists = lists.into_iter();
        let movies = lists.next().unwrap_or_default();
        let tv_shows = lists.next().unwrap_or_default();
        let popular = lists.next().unwrap_or_default();

        Self {
            movies: cards(Medium::Movie, &movies),
            tv_shows: cards(Medium::TvShow, &tv_shows),
            popular_queries: popular_queries(&popular),
        }
    }

    /// Keyboard-selectable items: movies, then shows
    pub fn selectable(&self) -> Vec<&MediaCard> {
        self.movies.iter().chain(self.tv_shows.iter()).collect()
    }

    pub fn selectable_len(&self) -> usize {
        self.movies.len() + self.tv_shows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectable_len() == 0 && self.popular_queries.is_empty()
    }
}

/// Runs one autocomplete round-trip; failures yield empty rails
pub async fn fetch_autocomplete(
    gateway: &dyn SearchGateway,
    q: &str,
    popular_collection: &str,
) -> AutocompleteResults {
    let (searches, common) = autocomplete_searches(q, popular_collection);
    let lists = execute_multiplexed(gateway, searches, common).await;
    AutocompleteResults::from_lists(lists)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelState {
    Idle,
    FocusedEmpty,
    Loading,
    Results,
    NoResults,
}

/// Identifies an issued search; only the latest ticket's response is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub seq: u64,
    pub q: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Search(SearchTicket),
    Navigate(String),
    TrackClick(AnalyticsEvent),
    /// Call [`AutocompleteSession::blur_elapsed`] after the delay
    ScheduleBlur(Duration),
    FocusInput,
    BlurInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

#[derive(Debug, Clone, Default)]
pub struct AutocompleteSession {
    user_id: Option<String>,
    input: String,
    focused: bool,
    has_searched_once: bool,
    loading: bool,
    received: bool,
    latest_seq: u64,
    results: AutocompleteResults,
    selected: Option<usize>,
    pointer_over_results: bool,
    blur_pending: bool,
}

impl AutocompleteSession {
    /// `user_id` enables click tracking; anonymous sessions track nothing
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn state(&self) -> PanelState {
        if !self.focused {
            PanelState::Idle
        } else if self.loading {
            PanelState::Loading
        } else if !self.received {
            PanelState::FocusedEmpty
        } else if self.results.is_empty() {
            PanelState::NoResults
        } else {
            PanelState::Results
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn results(&self) -> &AutocompleteResults {
        &self.results
    }

    pub fn is_open(&self) -> bool {
        self.focused
    }

    fn issue(&mut self, q: String) -> Effect {
        self.latest_seq += 1;
        self.loading = true;
        self.has_searched_once = true;
        Effect::Search(SearchTicket {
            seq: self.latest_seq,
            q,
        })
    }

    /// Opens the panel; the first focus of a session runs a wildcard search
    pub fn focus(&mut self) -> Vec<Effect> {
        self.focused = true;
        self.blur_pending = false;

        if self.has_searched_once {
            Vec::new()
        } else {
            vec![self.issue("*".to_string())]
        }
    }

    /// Keystroke in the search box
    pub fn type_text(&mut self, text: impl Into<String>) -> Vec<Effect> {
        self.input = text.into();
        self.focused = true;
        self.blur_pending = false;
        let q = normalize_query(&self.input);
        vec![self.issue(q)]
    }

    /// Applies a response; returns `false` when it belongs to a superseded search
    pub fn apply(&mut self, seq: u64, results: AutocompleteResults) -> bool {
        if seq != self.latest_seq {
            tracing::debug!(
                seq,
                latest = self.latest_seq,
                "Discarding stale autocomplete response"
            );
            return false;
        }

        self.loading = false;
        self.received = true;
        self.selected = (results.selectable_len() > 0).then_some(0);
        self.results = results;
        true
    }

    pub fn key(&mut self, key: Key) -> Vec<Effect> {
        if !self.focused {
            return Vec::new();
        }

        if key == Key::Escape {
            return self.close();
        }

        let len = self.results.selectable_len();
        if self.loading || len == 0 {
            return Vec::new();
        }

        match key {
            Key::ArrowDown => {
                self.selected = Some(match self.selected {
                    Some(index) if index + 1 < len => index + 1,
                    _ => 0,
                });
                Vec::new()
            }
            Key::ArrowUp => {
                self.selected = Some(match self.selected {
                    Some(index) if index > 0 && index < len => index - 1,
                    _ => len - 1,
                });
                Vec::new()
            }
            Key::Enter => match self.selected {
                Some(index) if index < len => self.select(index),
                _ => Vec::new(),
            },
            Key::Escape => Vec::new(),
        }
    }

    /// Pointer click or Enter on a result
    pub fn select(&mut self, index: usize) -> Vec<Effect> {
        let Some(card) = self.results.selectable().get(index).map(|card| (*card).clone()) else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        if let Some(user_id) = &self.user_id {
            effects.push(Effect::TrackClick(AnalyticsEvent::click(
                card.collection_type,
                user_id,
                &card.id,
            )));
        }
        effects.push(Effect::Navigate(card.href()));

        self.input = card.title;
        effects.extend(self.close());
        effects
    }

    /// Replaces the input with a popular query and searches it, keeping focus
    pub fn choose_popular_query(&mut self, index: usize) -> Vec<Effect> {
        let Some(query) = self.results.popular_queries.get(index).map(|p| p.q.clone()) else {
            return Vec::new();
        };

        let mut effects = vec![Effect::FocusInput];
        effects.extend(self.type_text(query));
        effects
    }

    pub fn hover(&mut self, index: usize) {
        if index < self.results.selectable_len() {
            self.selected = Some(index);
        }
    }

    pub fn pointer_enter_results(&mut self) {
        self.pointer_over_results = true;
    }

    pub fn pointer_leave_results(&mut self) {
        self.pointer_over_results = false;
    }

    /// Input lost focus; the panel closes after [`BLUR_GRACE`] unless the pointer is on it
    pub fn blur(&mut self) -> Vec<Effect> {
        if !self.focused || self.pointer_over_results {
            return Vec::new();
        }
        self.blur_pending = true;
        vec![Effect::ScheduleBlur(BLUR_GRACE)]
    }

    pub fn blur_elapsed(&mut self) {
        if self.blur_pending && !self.pointer_over_results {
            self.focused = false;
        }
        self.blur_pending = false;
    }

    /// Ctrl+K / Cmd+K focuses the box from anywhere
    pub fn global_shortcut(&mut self, key: &str, ctrl: bool, meta: bool) -> Vec<Effect> {
        if !key.eq_ignore_ascii_case("k") || !(ctrl || meta) {
            return Vec::new();
        }
        let mut effects = vec![Effect::FocusInput];
        effects.extend(self.focus());
        effects
    }

    fn close(&mut self) -> Vec<Effect> {
        self.focused = false;
        self.blur_pending = false;
        vec![Effect::BlurInput]
    }
}
