use std::sync::Arc;
use std::time::Instant;

use crate::{
    db::{AnnNeighbor, TitleStore},
    error::AppResult,
    models::{TitleCard, TitleType},
    services::scoring::{self, Candidate, ScoredTitle},
};

/// Neighbours requested from the vector index per request
pub const ANN_CANDIDATES: i64 = 1000;
/// Candidates kept after filtering, in ANN order
pub const MAX_FILTERED_CANDIDATES: usize = 500;

/// Keeps same-type neighbours with a poster, excluding the source title itself
///
/// Preserves ANN order and stops at [`MAX_FILTERED_CANDIDATES`].
pub fn filter_candidates(
    neighbors: Vec<AnnNeighbor>,
    source_id: i64,
    source_type: TitleType,
) -> Vec<AnnNeighbor> {
    neighbors
        .into_iter()
        .filter(|n| {
            n.card.id != source_id && n.card.title_type == source_type && n.card.has_poster()
        })
        .take(MAX_FILTERED_CANDIDATES)
        .collect()
}

/// Finds titles similar to a source title
///
/// Combines approximate nearest-neighbour retrieval over title embeddings with
/// genre overlap and a popularity prior. There is no fallback ranking: a source
/// without an embedding, or any store failure, fails the whole request.
#[derive(Clone)]
pub struct RecommendationService {
    store: Arc<dyn TitleStore>,
}

impl RecommendationService {
    pub fn new(store: Arc<dyn TitleStore>) -> Self {
        Self { store }
    }

    /// Up to `limit` titles most similar to `title_id`, best first
    pub async fn similar(&self, title_id: i64, limit: usize) -> AppResult<Vec<TitleCard>> {
        let ranked = self.similar_scored(title_id, limit).await?;
        Ok(ranked.into_iter().map(|s| s.card).collect())
    }

    /// Like [`similar`](Self::similar) but keeps the hybrid score of each result
    pub async fn similar_scored(&self, title_id: i64, limit: usize) -> AppResult<Vec<ScoredTitle>> {
        let start = Instant::now();

        let (embedding, title_type) = self.store.embedding_and_type(title_id).await?;
        let neighbors = self.store.ann_nearest(&embedding, ANN_CANDIDATES).await?;
        let retrieved = neighbors.len();

        let pool = filter_candidates(neighbors, title_id, title_type);
        if pool.is_empty() || limit == 0 {
            tracing::debug!(title_id, retrieved, "No eligible similar-title candidates");
            return Ok(Vec::new());
        }

        let mut ids: Vec<i64> = pool.iter().map(|n| n.card.id).collect();
        ids.push(title_id);
        let genres = self.store.genres_of(&ids).await?;
        let max_popularity = self.store.max_popularity().await?;

        let source_genres = genres.get(&title_id);
        let source_count = source_genres.map_or(0, |g| g.len());

        let candidates: Vec<Candidate> = pool
            .into_iter()
            .map(|neighbor| {
                let embed_sim = neighbor.similarity();
                let (shared_genres, candidate_genres) = match genres.get(&neighbor.card.id) {
                    Some(candidate) => (
                        source_genres.map_or(0, |source| candidate.intersection(source).count()),
                        candidate.len(),
                    ),
                    None => (0, 0),
                };
                Candidate {
                    card: neighbor.card,
                    embed_sim,
                    shared_genres,
                    candidate_genres,
                }
            })
            .collect();
        let eligible = candidates.len();

        let ranked = scoring::rank(candidates, source_count, max_popularity, limit);

        tracing::info!(
            title_id,
            retrieved,
            eligible,
            returned = ranked.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Similar titles ranked"
        );

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MockTitleStore;
    use crate::db::{MemoryTitleStore, TitleRecord};
    use crate::error::AppError;
    use crate::services::scoring::{jaccard, popularity_term, hybrid_score};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    const ACTION: i64 = 28;
    const DRAMA: i64 = 18;
    const COMEDY: i64 = 35;

    fn released() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    /// A, B, C from the reference scenario plus a genre-disjoint, less similar blockbuster D
    fn scenario_store() -> MemoryTitleStore {
        let mut store = MemoryTitleStore::new();
        let records = [
            TitleRecord::new(1, TitleType::Movie, "A")
                .genres([ACTION, DRAMA])
                .popularity(90.0)
                .embedding(vec![1.0, 0.0, 0.0])
                .poster("/a.jpg"),
            TitleRecord::new(2, TitleType::Movie, "B")
                .genres([ACTION])
                .popularity(40.0)
                .embedding(vec![0.95, 0.05, 0.0])
                .poster("/b.jpg"),
            TitleRecord::new(3, TitleType::Tv, "C")
                .genres([ACTION, DRAMA])
                .popularity(99.0)
                .embedding(vec![0.99, 0.01, 0.0])
                .poster("/c.jpg"),
            TitleRecord::new(4, TitleType::Movie, "D")
                .genres([COMEDY])
                .popularity(1000.0)
                .embedding(vec![0.5, 0.5, 0.5])
                .poster("/d.jpg"),
        ];
        for record in records {
            store.insert(record.released(released())).unwrap();
        }
        store
    }

    fn service(store: MemoryTitleStore) -> RecommendationService {
        RecommendationService::new(Arc::new(store))
    }

    fn neighbor(id: i64, title_type: TitleType, poster: bool, distance: f64) -> AnnNeighbor {
        let mut record = TitleRecord::new(id, title_type, "N");
        if poster {
            record = record.poster("/n.jpg");
        }
        AnnNeighbor {
            card: record.card,
            distance,
        }
    }

    #[test]
    fn test_filter_candidates_drops_self_type_mismatch_and_posterless() {
        let neighbors = vec![
            neighbor(1, TitleType::Movie, true, 0.0),
            neighbor(2, TitleType::Movie, true, 0.1),
            neighbor(3, TitleType::Tv, true, 0.1),
            neighbor(4, TitleType::Movie, false, 0.2),
            neighbor(5, TitleType::Movie, true, 0.3),
        ];

        let kept = filter_candidates(neighbors, 1, TitleType::Movie);
        let ids: Vec<i64> = kept.iter().map(|n| n.card.id).collect();
        assert_eq!(ids, vec![2, 5]);
    }

    #[test]
    fn test_filter_candidates_caps_pool_in_ann_order() {
        let neighbors = (0..700)
            .map(|i| neighbor(i + 10, TitleType::Movie, true, i as f64 / 1000.0))
            .collect();
        let kept = filter_candidates(neighbors, 1, TitleType::Movie);
        assert_eq!(kept.len(), MAX_FILTERED_CANDIDATES);
        assert_eq!(kept.first().map(|n| n.card.id), Some(10));
        assert_eq!(kept.last().map(|n| n.card.id), Some(509));
    }

    #[tokio::test]
    async fn test_scenario_returns_b_never_c() {
        let results = service(scenario_store()).similar(1, 5).await.unwrap();
        let ids: Vec<i64> = results.iter().map(|c| c.id).collect();

        assert!(ids.contains(&2));
        assert!(!ids.contains(&3));
        let b = ids.iter().position(|&id| id == 2).unwrap();
        let d = ids.iter().position(|&id| id == 4).unwrap();
        assert!(b < d, "B must outrank the genre-disjoint blockbuster");
    }

    #[tokio::test]
    async fn test_results_exclude_source_and_match_type() {
        let results = service(scenario_store()).similar(1, 50).await.unwrap();
        assert!(results.iter().all(|c| c.id != 1));
        assert!(results.iter().all(|c| c.title_type == TitleType::Movie));
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_limit_bounds_result_size() {
        let results = service(scenario_store()).similar(1, 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 2);
    }

    #[tokio::test]
    async fn test_scores_are_recomputable_and_non_increasing() {
        let ranked = service(scenario_store()).similar_scored(1, 5).await.unwrap();
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));

        // B: shares Action with {Action, Drama}; catalog max popularity is 1000.
        let b = &ranked[0];
        let embed_sim = 1.0 - crate::db::memory::cosine_distance(&[1.0, 0.0, 0.0], &[0.95, 0.05, 0.0]);
        let expected = hybrid_score(
            embed_sim,
            jaccard(1, 2, 1),
            popularity_term(Some(40.0), Some(1000.0)),
        );
        assert_eq!(b.card.id, 2);
        assert!((b.score - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_only_tv_neighbours_yields_empty_list() {
        let mut store = MemoryTitleStore::new();
        store
            .insert(TitleRecord::new(1, TitleType::Movie, "Solo").embedding(vec![1.0, 0.0]).poster("/s.jpg"))
            .unwrap();
        store
            .insert(TitleRecord::new(2, TitleType::Tv, "Show").embedding(vec![1.0, 0.0]).poster("/t.jpg"))
            .unwrap();

        let results = service(store).similar(1, 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_title_is_not_found() {
        let result = service(scenario_store()).similar(999, 5).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_title_without_embedding_is_not_found() {
        let mut store = scenario_store();
        store
            .insert(TitleRecord::new(5, TitleType::Movie, "No Vector").poster("/x.jpg"))
            .unwrap();
        let result = service(store).similar(5, 5).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_genreless_source_still_ranks() {
        let mut store = MemoryTitleStore::new();
        store
            .insert(TitleRecord::new(1, TitleType::Movie, "Src").embedding(vec![1.0, 0.0]))
            .unwrap();
        store
            .insert(TitleRecord::new(2, TitleType::Movie, "Near").embedding(vec![1.0, 0.1]).poster("/n.jpg"))
            .unwrap();

        let ranked = service(store).similar_scored(1, 5).await.unwrap();
        assert_eq!(ranked.len(), 1);
        // No genres anywhere and no popularity: only the embedding term contributes.
        let embed_sim = 1.0 - crate::db::memory::cosine_distance(&[1.0, 0.0], &[1.0, 0.1]);
        assert!((ranked[0].score - 0.55 * embed_sim).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_store_failure_during_ann_propagates() {
        let mut store = MockTitleStore::new();
        store
            .expect_embedding_and_type()
            .returning(|_| Ok((vec![1.0, 0.0], TitleType::Movie)));
        store
            .expect_ann_nearest()
            .returning(|_, _| Err(AppError::StoreUnavailable(sqlx::Error::PoolTimedOut)));
        store.expect_genres_of().never();
        store.expect_max_popularity().never();

        let result = RecommendationService::new(Arc::new(store)).similar(1, 5).await;
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_store_failure_fetching_popularity_fails_whole_ranking() {
        let mut store = MockTitleStore::new();
        store
            .expect_embedding_and_type()
            .returning(|_| Ok((vec![1.0, 0.0], TitleType::Movie)));
        store.expect_ann_nearest().returning(|_, _| {
            Ok(vec![AnnNeighbor {
                card: TitleRecord::new(2, TitleType::Movie, "B").poster("/b.jpg").card,
                distance: 0.1,
            }])
        });
        store.expect_genres_of().returning(|_| Ok(HashMap::new()));
        store
            .expect_max_popularity()
            .returning(|| Err(AppError::StoreUnavailable(sqlx::Error::PoolClosed)));

        let result = RecommendationService::new(Arc::new(store)).similar(1, 5).await;
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_requests_the_full_ann_pool() {
        let mut store = MockTitleStore::new();
        store
            .expect_embedding_and_type()
            .returning(|_| Ok((vec![0.5, 0.5], TitleType::Tv)));
        store
            .expect_ann_nearest()
            .withf(|embedding, k| embedding.to_vec() == vec![0.5f32, 0.5] && *k == ANN_CANDIDATES)
            .times(1)
            .returning(|_, _| Ok(Vec::new()));

        let results = RecommendationService::new(Arc::new(store)).similar(7, 5).await.unwrap();
        assert!(results.is_empty());
    }
}
