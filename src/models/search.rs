use serde::{Deserialize, Serialize};

use super::{TitleCard, TitleType};
use crate::error::{AppError, AppResult};

pub const MAX_SEARCH_LIMIT: i64 = 100;
pub const MAX_SEARCH_OFFSET: i64 = 5000;
pub const DEFAULT_SEARCH_LIMIT: i64 = 20;

/// Ordering applied to faceted search results
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchSort {
    #[default]
    Popularity,
    Newest,
    Rating,
}

/// Faceted search request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    pub query: Option<String>,
    #[serde(rename = "type")]
    pub title_type: Option<TitleType>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub genre_ids: Option<Vec<i64>>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
    pub sort: SearchSort,
    pub limit: i64,
    pub offset: i64,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: None,
            title_type: None,
            year_from: None,
            year_to: None,
            genre_ids: None,
            min_rating: None,
            max_rating: None,
            sort: SearchSort::default(),
            limit: DEFAULT_SEARCH_LIMIT,
            offset: 0,
        }
    }
}

impl SearchQuery {
    /// Only the first supplied genre id is applied as a filter.
    pub fn genre_id(&self) -> Option<i64> {
        self.genre_ids.as_ref().and_then(|ids| ids.first().copied())
    }

    /// Trimmed free-text query, empty when absent
    pub fn text(&self) -> &str {
        self.query.as_deref().map(str::trim).unwrap_or("")
    }

    /// Rejects malformed facet combinations before they reach the engine
    pub fn validate(&self) -> AppResult<()> {
        if !(1..=MAX_SEARCH_LIMIT).contains(&self.limit) {
            return Err(AppError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_SEARCH_LIMIT
            )));
        }
        if !(0..=MAX_SEARCH_OFFSET).contains(&self.offset) {
            return Err(AppError::InvalidInput(format!(
                "offset must be between 0 and {}",
                MAX_SEARCH_OFFSET
            )));
        }
        if let (Some(from), Some(to)) = (self.year_from, self.year_to) {
            if from > to {
                return Err(AppError::InvalidInput(
                    "yearFrom must not be after yearTo".to_string(),
                ));
            }
        }
        for rating in [self.min_rating, self.max_rating].into_iter().flatten() {
            if !(0.0..=10.0).contains(&rating) {
                return Err(AppError::InvalidInput(
                    "ratings must be between 0 and 10".to_string(),
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.min_rating, self.max_rating) {
            if min > max {
                return Err(AppError::InvalidInput(
                    "minRating must not exceed maxRating".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// One page of faceted search results with a capped total
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub items: Vec<TitleCard>,
    /// Lower bound on the match count when `total_capped` is set
    pub total: i64,
    pub total_capped: bool,
}
