use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;

use crate::{
    db::TitleStore,
    error::AppResult,
    models::{SearchQuery, SearchResult, SearchSuggestion, TitleCard},
    query::{PrefixQuery, TitleFilter},
    services::today,
};

/// Text matches fetched before popularity ordering
pub const MAX_SUGGESTION_CANDIDATES: i64 = 500;
pub const MAX_SUGGESTIONS: usize = 6;
/// Largest total reported by search; beyond it the total is flagged as capped
pub const MAX_SEARCH_RESULTS: i64 = 1000;

/// Popularity descending with missing popularity last, then id ascending
fn by_popularity(a: &TitleCard, b: &TitleCard) -> Ordering {
    let primary = match (a.popularity, b.popularity) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    primary.then(a.id.cmp(&b.id))
}

/// Typeahead suggestions and faceted search over released titles
#[derive(Clone)]
pub struct SearchService {
    store: Arc<dyn TitleStore>,
}

impl SearchService {
    pub fn new(store: Arc<dyn TitleStore>) -> Self {
        Self { store }
    }

    /// At most six released titles whose names match every query term as a prefix
    pub async fn suggest(&self, raw_query: &str) -> AppResult<Vec<SearchSuggestion>> {
        self.suggest_as_of(raw_query, today()).await
    }

    /// Suggestions treating `today` as the current date
    ///
    /// The store narrows to a bounded set of text matches first; only those
    /// matches are ordered by popularity.
    pub async fn suggest_as_of(
        &self,
        raw_query: &str,
        today: NaiveDate,
    ) -> AppResult<Vec<SearchSuggestion>> {
        let Some(query) = PrefixQuery::parse(raw_query) else {
            return Ok(Vec::new());
        };

        let filter = TitleFilter::released_by(today);
        let mut matches = self
            .store
            .text_search_match(&query, &filter, MAX_SUGGESTION_CANDIDATES)
            .await?;
        let matched = matches.len();

        matches.sort_by(by_popularity);
        matches.truncate(MAX_SUGGESTIONS);

        tracing::debug!(
            terms = query.terms().len(),
            matched,
            returned = matches.len(),
            "Suggestions computed"
        );

        Ok(matches.into_iter().map(SearchSuggestion::from).collect())
    }

    /// One page of filtered, sorted titles plus a capped total
    pub async fn search(&self, query: &SearchQuery) -> AppResult<SearchResult> {
        self.search_as_of(query, today()).await
    }

    /// Search treating `today` as the current date
    ///
    /// The page and the count run as separate queries over the same filter;
    /// the count stops after `MAX_SEARCH_RESULTS + 1` rows.
    pub async fn search_as_of(&self, query: &SearchQuery, today: NaiveDate) -> AppResult<SearchResult> {
        let start = Instant::now();
        let filter = TitleFilter::for_search(query, today)?;

        let (items, count) = tokio::try_join!(
            self.store
                .filtered_sorted_page(&filter, query.sort, query.limit, query.offset),
            self.store.count_match(&filter, MAX_SEARCH_RESULTS + 1),
        )?;

        let result = SearchResult {
            items,
            total: count.min(MAX_SEARCH_RESULTS),
            total_capped: count > MAX_SEARCH_RESULTS,
        };

        tracing::info!(
            predicates = filter.predicates().len(),
            sort = ?query.sort,
            offset = query.offset,
            returned = result.items.len(),
            total = result.total,
            total_capped = result.total_capped,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(result)
    }
}
