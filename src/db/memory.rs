use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::{
    db::store::{AnnNeighbor, TitleStore},
    error::{AppError, AppResult},
    models::{Genre, SearchSort, TitleCard, TitleType},
    query::{PrefixQuery, Predicate, TitleFilter},
};

/// A catalog entry held by [`MemoryTitleStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct TitleRecord {
    pub card: TitleCard,
    pub embedding: Option<Vec<f32>>,
    pub genres: HashSet<i64>,
    pub rating_weighted: Option<f64>,
}

impl TitleRecord {
    pub fn new(id: i64, title_type: TitleType, title: &str) -> Self {
        Self {
            card: TitleCard {
                id,
                title_type,
                title: title.to_string(),
                overview: None,
                release_date: None,
                rating: 0.0,
                rating_count: 0,
                popularity: None,
                poster_url: None,
                backdrop_url: None,
            },
            embedding: None,
            genres: HashSet::new(),
            rating_weighted: None,
        }
    }

    pub fn released(mut self, date: NaiveDate) -> Self {
        self.card.release_date = Some(date);
        self
    }

    pub fn popularity(mut self, popularity: f64) -> Self {
        self.card.popularity = Some(popularity);
        self
    }

    pub fn rating(mut self, rating: f64, count: i32) -> Self {
        self.card.rating = rating;
        self.card.rating_count = count;
        self
    }

    pub fn rating_weighted(mut self, weighted: f64) -> Self {
        self.rating_weighted = Some(weighted);
        self
    }

    pub fn poster(mut self, url: &str) -> Self {
        self.card.poster_url = Some(url.to_string());
        self
    }

    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn genres<I: IntoIterator<Item = i64>>(mut self, genres: I) -> Self {
        self.genres = genres.into_iter().collect();
        self
    }

    fn satisfies(&self, predicate: &Predicate) -> bool {
        let card = &self.card;
        match predicate {
            Predicate::Text(query) => query.matches(&card.title),
            Predicate::ReleasedOnOrBefore(date) => card.release_date.is_some_and(|d| d <= *date),
            Predicate::ReleasedOnOrAfter(date) => card.release_date.is_some_and(|d| d >= *date),
            Predicate::TypeIs(title_type) => card.title_type == *title_type,
            Predicate::RatingAtLeast(rating) => card.rating >= *rating,
            Predicate::RatingAtMost(rating) => card.rating <= *rating,
            Predicate::HasGenre(genre_id) => self.genres.contains(genre_id),
        }
    }

    fn matches(&self, filter: &TitleFilter) -> bool {
        filter.predicates().iter().all(|p| self.satisfies(p))
    }
}

/// Cosine distance; a zero vector is treated as maximally distant from everything
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Descending with missing values last, as `DESC NULLS LAST`
fn desc_nulls_last<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Title store held entirely in memory.
///
/// Nearest-neighbour lookups are exact brute-force scans, which makes this
/// store a deterministic stand-in for the PostgreSQL store in tests and local
/// demos. It is immutable once shared.
#[derive(Debug, Clone, Default)]
pub struct MemoryTitleStore {
    titles: Vec<TitleRecord>,
    genres: Vec<Genre>,
    embedding_dim: Option<usize>,
}

impl MemoryTitleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a title, enforcing the catalog invariants the engine relies on
    pub fn insert(&mut self, record: TitleRecord) -> AppResult<()> {
        let card = &record.card;
        if self.titles.iter().any(|t| t.card.id == card.id) {
            return Err(AppError::InvalidInput(format!("Duplicate title id {}", card.id)));
        }
        if !(0.0..=10.0).contains(&card.rating) {
            return Err(AppError::InvalidInput(format!(
                "Title {} rating {} outside [0, 10]",
                card.id, card.rating
            )));
        }
        if card.popularity.is_some_and(|p| p < 0.0) {
            return Err(AppError::InvalidInput(format!(
                "Title {} has negative popularity",
                card.id
            )));
        }
        if let Some(embedding) = &record.embedding {
            match self.embedding_dim {
                Some(dim) if dim != embedding.len() => {
                    return Err(AppError::InvalidInput(format!(
                        "Title {} embedding has {} dimensions, expected {}",
                        card.id,
                        embedding.len(),
                        dim
                    )));
                }
                Some(_) => {}
                None => self.embedding_dim = Some(embedding.len()),
            }
        }

        self.titles.push(record);
        Ok(())
    }

    pub fn add_genre(&mut self, id: i64, name: &str) {
        self.genres.push(Genre {
            id,
            name: name.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    fn matching<'a>(&'a self, filter: &'a TitleFilter) -> impl Iterator<Item = &'a TitleRecord> {
        self.titles.iter().filter(move |t| t.matches(filter))
    }
}

#[async_trait::async_trait]
impl TitleStore for MemoryTitleStore {
    async fn embedding_and_type(&self, title_id: i64) -> AppResult<(Vec<f32>, TitleType)> {
        self.titles
            .iter()
            .find(|t| t.card.id == title_id)
            .and_then(|t| t.embedding.clone().map(|e| (e, t.card.title_type)))
            .ok_or_else(|| AppError::title_not_found(title_id))
    }

    async fn ann_nearest(&self, embedding: &[f32], k: i64) -> AppResult<Vec<AnnNeighbor>> {
        let mut neighbors: Vec<AnnNeighbor> = self
            .titles
            .iter()
            .filter_map(|t| {
                t.embedding.as_ref().map(|e| AnnNeighbor {
                    card: t.card.clone(),
                    distance: cosine_distance(embedding, e),
                })
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.card.id.cmp(&b.card.id))
        });
        neighbors.truncate(usize::try_from(k).unwrap_or(0));
        Ok(neighbors)
    }

    async fn genres_of(&self, title_ids: &[i64]) -> AppResult<HashMap<i64, HashSet<i64>>> {
        Ok(self
            .titles
            .iter()
            .filter(|t| title_ids.contains(&t.card.id) && !t.genres.is_empty())
            .map(|t| (t.card.id, t.genres.clone()))
            .collect())
    }

    async fn max_popularity(&self) -> AppResult<Option<f64>> {
        Ok(self
            .titles
            .iter()
            .filter_map(|t| t.card.popularity)
            .reduce(f64::max))
    }

    async fn text_search_match(
        &self,
        query: &PrefixQuery,
        filter: &TitleFilter,
        limit: i64,
    ) -> AppResult<Vec<TitleCard>> {
        Ok(self
            .matching(filter)
            .filter(|t| query.matches(&t.card.title))
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|t| t.card.clone())
            .collect())
    }

    async fn count_match(&self, filter: &TitleFilter, cap: i64) -> AppResult<i64> {
        let cap = usize::try_from(cap).unwrap_or(0);
        Ok(self.matching(filter).take(cap).count() as i64)
    }

    async fn filtered_sorted_page(
        &self,
        filter: &TitleFilter,
        sort: SearchSort,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<TitleCard>> {
        let mut rows: Vec<&TitleRecord> = self.matching(filter).collect();
        rows.sort_by(|a, b| {
            let primary = match sort {
                SearchSort::Popularity => desc_nulls_last(a.card.popularity, b.card.popularity),
                SearchSort::Newest => desc_nulls_last(a.card.release_date, b.card.release_date),
                SearchSort::Rating => desc_nulls_last(a.rating_weighted, b.rating_weighted),
            };
            primary.then(a.card.id.cmp(&b.card.id))
        });

        Ok(rows
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|t| t.card.clone())
            .collect())
    }

    async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        Ok(self.genres.clone())
    }

    async fn estimated_title_count(&self) -> AppResult<i64> {
        Ok(self.titles.len() as i64)
    }
}
