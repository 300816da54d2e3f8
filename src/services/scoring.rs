//! Hybrid scoring for "similar titles".
//!
//! Each candidate gets
//!
//! ```text
//! 0.55 * embedding similarity
//! + 0.20 * genre jaccard
//! + 0.25 * sqrt(popularity / catalog max popularity)
//! ```
//!
//! Embedding similarity dominates, genre overlap is a coarse secondary signal
//! and popularity acts as a quality prior. The square root flattens the long
//! tail of popularity so it stays on the same ~[0, 1] scale as the other terms.

use std::cmp::Ordering;

use crate::models::TitleCard;

pub const EMBEDDING_WEIGHT: f64 = 0.55;
pub const GENRE_WEIGHT: f64 = 0.20;
pub const POPULARITY_WEIGHT: f64 = 0.25;

/// A title under consideration for one ranking request
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub card: TitleCard,
    /// `1 - cosine distance` to the source title
    pub embed_sim: f64,
    pub shared_genres: usize,
    pub candidate_genres: usize,
}

/// A ranked result with the score it was ordered by
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTitle {
    pub card: TitleCard,
    pub score: f64,
}

/// Jaccard similarity from set sizes.
///
/// An empty union (neither title has genres) scores 0.
pub fn jaccard(shared: usize, source: usize, candidate: usize) -> f64 {
    let union = (source + candidate).saturating_sub(shared);
    if union == 0 {
        return 0.0;
    }
    shared as f64 / union as f64
}

/// Popularity normalized against the catalog maximum, then square-rooted.
///
/// Missing popularity counts as 0; without a positive maximum the term is 0.
pub fn popularity_term(popularity: Option<f64>, max_popularity: Option<f64>) -> f64 {
    match max_popularity {
        Some(max) if max > 0.0 => (popularity.unwrap_or(0.0).max(0.0) / max).sqrt(),
        _ => 0.0,
    }
}

pub fn hybrid_score(embed_sim: f64, jaccard_sim: f64, popularity: f64) -> f64 {
    EMBEDDING_WEIGHT * embed_sim + GENRE_WEIGHT * jaccard_sim + POPULARITY_WEIGHT * popularity
}

impl Candidate {
    pub fn score(&self, source_genres: usize, max_popularity: Option<f64>) -> f64 {
        hybrid_score(
            self.embed_sim,
            jaccard(self.shared_genres, source_genres, self.candidate_genres),
            popularity_term(self.card.popularity, max_popularity),
        )
    }
}

/// Scores candidates and keeps the best `limit`, highest score first, ties by ascending id
pub fn rank(
    candidates: Vec<Candidate>,
    source_genres: usize,
    max_popularity: Option<f64>,
    limit: usize,
) -> Vec<ScoredTitle> {
    let mut scored: Vec<ScoredTitle> = candidates
        .into_iter()
        .map(|c| ScoredTitle {
            score: c.score(source_genres, max_popularity),
            card: c.card,
        })
        .collect();

    scored.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => a.card.id.cmp(&b.card.id),
        other => other,
    });
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TitleType;

    fn card(id: i64, popularity: Option<f64>) -> TitleCard {
        TitleCard {
            id,
            title_type: TitleType::Movie,
            title: format!("Title {}", id),
            overview: None,
            release_date: None,
            rating: 7.0,
            rating_count: 10,
            popularity,
            poster_url: Some(format!("/{}.jpg", id)),
            backdrop_url: None,
        }
    }

    fn candidate(id: i64, embed_sim: f64, shared: usize, genres: usize, pop: Option<f64>) -> Candidate {
        Candidate {
            card: card(id, pop),
            embed_sim,
            shared_genres: shared,
            candidate_genres: genres,
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        assert!((EMBEDDING_WEIGHT + GENRE_WEIGHT + POPULARITY_WEIGHT - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard(1, 2, 1), 0.5);
        assert_eq!(jaccard(2, 2, 2), 1.0);
        assert_eq!(jaccard(0, 2, 3), 0.0);
    }

    #[test]
    fn test_jaccard_empty_union_is_zero() {
        assert_eq!(jaccard(0, 0, 0), 0.0);
    }

    #[test]
    fn test_popularity_term() {
        assert_eq!(popularity_term(Some(25.0), Some(100.0)), 0.5);
        assert_eq!(popularity_term(None, Some(100.0)), 0.0);
        assert_eq!(popularity_term(Some(-3.0), Some(100.0)), 0.0);
        assert_eq!(popularity_term(Some(10.0), Some(0.0)), 0.0);
        assert_eq!(popularity_term(Some(10.0), None), 0.0);
    }

    #[test]
    fn test_hybrid_score() {
        let score = hybrid_score(1.0, 0.5, 0.5);
        assert!((score - (0.55 + 0.10 + 0.125)).abs() < 1e-12);
    }

    #[test]
    fn test_rank_orders_by_score_then_id() {
        let candidates = vec![
            candidate(30, 0.5, 0, 0, None),
            candidate(10, 0.9, 1, 1, Some(10.0)),
            candidate(20, 0.5, 0, 0, None),
        ];

        let ranked = rank(candidates, 2, Some(100.0), 10);
        let ids: Vec<i64> = ranked.iter().map(|s| s.card.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_rank_truncates_to_limit() {
        let candidates = (1..=8).map(|id| candidate(id, 0.1 * id as f64, 0, 0, None)).collect();
        let ranked = rank(candidates, 0, None, 3);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].card.id, 8);
    }

    #[test]
    fn test_popularity_does_not_override_similarity_and_genres() {
        // Close embedding with genre overlap vs. a distant, genre-disjoint blockbuster.
        let close = candidate(1, 0.95, 1, 1, Some(1.0));
        let blockbuster = candidate(2, 0.40, 0, 3, Some(1000.0));
        let ranked = rank(vec![blockbuster, close], 2, Some(1000.0), 2);
        assert_eq!(ranked[0].card.id, 1);
    }
}
