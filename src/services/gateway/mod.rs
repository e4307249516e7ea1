/// Search engine gateway
///
/// Everything that talks to the hosted search engine goes through the `SearchGateway`
/// trait, so the rest of the crate only deals in `SearchRequest`s and `HitList`s.
/// The free functions here add the per-rail failure isolation the pages rely on:
/// an engine error never escapes as an error, it becomes an empty rail.
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{AnalyticsEvent, HitList, MultiSearchParams, SearchRequest},
};

pub mod typesense;

pub use typesense::TypesenseGateway;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchGateway: Send + Sync {
    /// Runs a single search against the request's collection
    async fn search(&self, request: SearchRequest) -> AppResult<HitList>;

    /// Runs several searches in one round-trip.
    ///
    /// The outer error covers transport failures; each inner result covers one search,
    /// in request order.
    async fn multi_search(
        &self,
        searches: Vec<SearchRequest>,
        common: MultiSearchParams,
    ) -> AppResult<Vec<AppResult<HitList>>>;

    /// Records an analytics event
    async fn create_event(&self, event: AnalyticsEvent) -> AppResult<()>;

    /// Gateway name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Executes independent rails in one multiplexed call.
///
/// Always returns one `HitList` per request; a failed search (or a failed call)
/// yields empty lists for the affected rails only.
pub async fn execute_multiplexed(
    gateway: &dyn SearchGateway,
    searches: Vec<SearchRequest>,
    common: MultiSearchParams,
) -> Vec<HitList> {
    let expected = searches.len();
    if expected == 0 {
        return Vec::new();
    }

    let results = match gateway.multi_search(searches, common).await {
        Ok(results) => results,
        Err(e) => {
            tracing::warn!(
                error = %e,
                gateway = gateway.name(),
                rails = expected,
                "Multi-search failed, returning empty rails"
            );
            return vec![HitList::empty(); expected];
        }
    };

    let mut lists: Vec<HitList> = results
        .into_iter()
        .enumerate()
        .map(|(rail, result)| match result {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, rail, "Search rail failed");
                HitList::empty()
            }
        })
        .collect();

    if lists.len() != expected {
        tracing::warn!(
            expected,
            received = lists.len(),
            "Engine returned a different number of results than searches"
        );
        lists.resize(expected, HitList::empty());
    }

    lists
}

/// Executes each request as its own search session, concurrently.
///
/// Sessions share nothing; one failing or panicking does not affect the others.
pub async fn execute_independent(
    gateway: Arc<dyn SearchGateway>,
    requests: Vec<SearchRequest>,
) -> Vec<HitList> {
    let mut tasks = Vec::new();

    for request in requests {
        let gateway = gateway.clone();
        let task = tokio::spawn(async move { gateway.search(request).await });
        tasks.push(task);
    }

    let mut lists = Vec::with_capacity(tasks.len());

    for (rail, task) in tasks.into_iter().enumerate() {
        match task.await {
            Ok(Ok(list)) => lists.push(list),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, rail, "Search session failed");
                lists.push(HitList::empty());
            }
            Err(e) => {
                tracing::error!(error = %e, rail, "Search task join error");
                lists.push(HitList::empty());
            }
        }
    }

    lists
}

/// Runs one search, absorbing any failure into an empty list
pub async fn execute_single(gateway: &dyn SearchGateway, request: SearchRequest) -> HitList {
    match gateway.search(request).await {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!(error = %e, gateway = gateway.name(), "Search failed");
            HitList::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::Hit;
    use serde_json::json;

    fn list_with(ids: &[&str]) -> HitList {
        HitList {
            hits: ids
                .iter()
                .map(|id| Hit {
                    document: json!({ "id": id }),
                    text_match: None,
                })
                .collect(),
            found: ids.len() as u64,
            page: 1,
            facet_counts: vec![],
        }
    }

    #[tokio::test]
    async fn test_multiplexed_isolates_failed_rail() {
        let mut gateway = MockSearchGateway::new();
        gateway.expect_multi_search().returning(|_, _| {
            Ok(vec![
                Ok(list_with(&["1", "2"])),
                Err(AppError::SearchEngine("bad filter".to_string())),
                Ok(list_with(&["3"])),
            ])
        });
        gateway.expect_name().return_const("mock");

        let lists = execute_multiplexed(
            &gateway,
            vec![
                SearchRequest::new("Movie"),
                SearchRequest::new("TvShow"),
                SearchRequest::new("product_queries"),
            ],
            MultiSearchParams::default(),
        )
        .await;

        assert_eq!(lists.len(), 3);
        assert_eq!(lists[0].hits.len(), 2);
        assert!(lists[1].is_empty());
        assert_eq!(lists[2].hits.len(), 1);
    }

    #[tokio::test]
    async fn test_multiplexed_transport_failure_empties_all_rails() {
        let mut gateway = MockSearchGateway::new();
        gateway
            .expect_multi_search()
            .returning(|_, _| Err(AppError::SearchEngine("connection refused".to_string())));
        gateway.expect_name().return_const("mock");

        let lists = execute_multiplexed(
            &gateway,
            vec![SearchRequest::new("Movie"), SearchRequest::new("TvShow")],
            MultiSearchParams::default(),
        )
        .await;

        assert_eq!(lists, vec![HitList::empty(), HitList::empty()]);
    }

    #[tokio::test]
    async fn test_multiplexed_pads_short_responses() {
        let mut gateway = MockSearchGateway::new();
        gateway
            .expect_multi_search()
            .returning(|_, _| Ok(vec![Ok(list_with(&["1"]))]));
        gateway.expect_name().return_const("mock");

        let lists = execute_multiplexed(
            &gateway,
            vec![SearchRequest::new("Movie"), SearchRequest::new("TvShow")],
            MultiSearchParams::default(),
        )
        .await;

        assert_eq!(lists.len(), 2);
        assert!(lists[1].is_empty());
    }

    #[tokio::test]
    async fn test_independent_sessions_fail_separately() {
        let mut gateway = MockSearchGateway::new();
        gateway.expect_search().returning(|request| {
            match request.collection.as_deref() {
                Some("Movie") => Ok(list_with(&["1"])),
                _ => Err(AppError::SearchEngine("timeout".to_string())),
            }
        });
        gateway.expect_name().return_const("mock");

        let gateway: Arc<dyn SearchGateway> = Arc::new(gateway);
        let lists = execute_independent(
            gateway,
            vec![SearchRequest::new("Movie"), SearchRequest::new("TvShow")],
        )
        .await;

        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].hits.len(), 1);
        assert!(lists[1].is_empty());
    }

    #[test]
    fn test_execute_single_absorbs_errors() {
        let mut gateway = MockSearchGateway::new();
        gateway
            .expect_search()
            .returning(|_| Err(AppError::SearchEngine("down".to_string())));
        gateway.expect_name().return_const("mock");

        let list = tokio_test::block_on(execute_single(&gateway, SearchRequest::new("Movie")));
        assert!(list.is_empty());
    }
}
