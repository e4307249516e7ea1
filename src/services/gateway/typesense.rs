/// Typesense search gateway
///
/// Talks to a single Typesense node over HTTP with a search-only API key.
///
/// API Flow:
/// 1. Single search: GET /collections/{collection}/documents/search
/// 2. Multiplexed search: POST /multi_search, one body entry per rail
/// 3. Analytics: POST /analytics/events
use std::time::Duration;

use reqwest::{Client as HttpClient, Response};

use crate::{
    error::{AppError, AppResult},
    models::{
        AnalyticsEvent, HitList, MultiSearchParams, MultiSearchResponse, MultiSearchResult,
        SearchRequest, SearchResponse,
    },
    services::gateway::SearchGateway,
};

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

#[derive(Clone)]
pub struct TypesenseGateway {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
}

impl TypesenseGateway {
    pub fn new(base_url: String, api_key: String, timeout_seconds: u64) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, collection: &str) -> String {
        format!(
            "{}/collections/{}/documents/search",
            self.base_url,
            urlencoding::encode(collection)
        )
    }

    fn multi_search_url(&self) -> String {
        format!("{}/multi_search", self.base_url)
    }

    fn events_url(&self) -> String {
        format!("{}/analytics/events", self.base_url)
    }

    /// Turns a non-2xx response into a search engine error carrying the body
    async fn check_status(response: Response) -> AppResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::SearchEngine(format!(
            "Typesense returned status {}: {}",
            status, body
        )))
    }
}

fn into_hit_list(result: MultiSearchResult) -> AppResult<HitList> {
    match result {
        MultiSearchResult::Succeeded(response) => Ok(HitList::from(response)),
        MultiSearchResult::Failed { code, error } => Err(AppError::SearchEngine(format!(
            "search failed with code {}: {}",
            code, error
        ))),
    }
}

#[async_trait::async_trait]
impl SearchGateway for TypesenseGateway {
    async fn search(&self, request: SearchRequest) -> AppResult<HitList> {
        let collection = request.collection.clone().ok_or_else(|| {
            AppError::InvalidInput("Search request has no collection".to_string())
        })?;

        let response = self
            .http_client
            .get(self.search_url(&collection))
            .header(API_KEY_HEADER, &self.api_key)
            .query(&request.query_pairs())
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let body: SearchResponse = response.json().await?;

        tracing::debug!(
            collection = %collection,
            found = body.found,
            hits = body.hits.len(),
            "Search completed"
        );

        Ok(HitList::from(body))
    }

    async fn multi_search(
        &self,
        searches: Vec<SearchRequest>,
        common: MultiSearchParams,
    ) -> AppResult<Vec<AppResult<HitList>>> {
        let count = searches.len();
        let body = serde_json::json!({ "searches": searches });

        let response = self
            .http_client
            .post(self.multi_search_url())
            .header(API_KEY_HEADER, &self.api_key)
            .query(&common)
            .json(&body)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let response_text = response.text().await?;

        let parsed: MultiSearchResponse = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                response = %response_text,
                "Failed to deserialize multi-search response"
            );
            AppError::SearchEngine(format!("Failed to parse multi-search response: {}", e))
        })?;

        tracing::debug!(
            searches = count,
            results = parsed.results.len(),
            "Multi-search completed"
        );

        Ok(parsed.results.into_iter().map(into_hit_list).collect())
    }

    async fn create_event(&self, event: AnalyticsEvent) -> AppResult<()> {
        let response = self
            .http_client
            .post(self.events_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&event)
            .send()
            .await?;

        Self::check_status(response).await?;

        tracing::debug!(
            event = %event.name,
            doc_id = %event.data.doc_id,
            "Analytics event recorded"
        );

        Ok(())
    }

    fn name(&self) -> &'static str {
        "typesense"
    }
}
