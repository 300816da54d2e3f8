use std::collections::{HashMap, HashSet};

use crate::{
    error::AppResult,
    models::{Genre, SearchSort, TitleCard, TitleType},
    query::{PrefixQuery, TitleFilter},
};

/// A title returned by the vector index along with its cosine distance to the probe
#[derive(Debug, Clone, PartialEq)]
pub struct AnnNeighbor {
    pub card: TitleCard,
    pub distance: f64,
}

impl AnnNeighbor {
    /// Embedding similarity reported to the ranker
    pub fn similarity(&self) -> f64 {
        1.0 - self.distance
    }
}

/// Read-only access to the title catalog
///
/// The ranking and search services only talk to the catalog through this trait,
/// so the PostgreSQL store and the in-memory store are interchangeable.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TitleStore: Send + Sync {
    /// Embedding and media type of a title.
    ///
    /// Fails with `NotFound` when the title does not exist or has no embedding.
    async fn embedding_and_type(&self, title_id: i64) -> AppResult<(Vec<f32>, TitleType)>;

    /// Up to `k` titles ordered by ascending cosine distance to `embedding`
    async fn ann_nearest(&self, embedding: &[f32], k: i64) -> AppResult<Vec<AnnNeighbor>>;

    /// Genre ids of each requested title; titles without genres may be absent
    async fn genres_of(&self, title_ids: &[i64]) -> AppResult<HashMap<i64, HashSet<i64>>>;

    /// Highest popularity across the whole catalog
    async fn max_popularity(&self) -> AppResult<Option<f64>>;

    /// Up to `limit` titles matching both the text query and the filter, in no particular order
    async fn text_search_match(
        &self,
        query: &PrefixQuery,
        filter: &TitleFilter,
        limit: i64,
    ) -> AppResult<Vec<TitleCard>>;

    /// Number of matching titles, evaluating at most `cap` rows
    async fn count_match(&self, filter: &TitleFilter, cap: i64) -> AppResult<i64>;

    /// One sorted page of matching titles
    async fn filtered_sorted_page(
        &self,
        filter: &TitleFilter,
        sort: SearchSort,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<TitleCard>>;

    async fn list_genres(&self) -> AppResult<Vec<Genre>>;

    /// Cheap estimate of the catalog size
    async fn estimated_title_count(&self) -> AppResult<i64>;
}
