use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

/// Media type of a catalog title
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TitleType {
    Movie,
    Tv,
}

impl TitleType {
    /// Value stored in the `titles.type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            TitleType::Movie => "MOVIE",
            TitleType::Tv => "TV",
        }
    }
}

impl Display for TitleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TitleType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MOVIE" => Ok(TitleType::Movie),
            "TV" => Ok(TitleType::Tv),
            other => Err(AppError::Internal(format!("Unknown title type '{}'", other))),
        }
    }
}

/// Summary of a title as returned by similar/search/home listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleCard {
    pub id: i64,
    #[serde(rename = "type")]
    pub title_type: TitleType,
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub rating: f64,
    pub rating_count: i32,
    pub popularity: Option<f64>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
}

impl TitleCard {
    /// Titles without a poster are never offered as recommendations
    pub fn has_poster(&self) -> bool {
        self.poster_url.is_some()
    }
}

/// Lightweight typeahead entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchSuggestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub title_type: TitleType,
    pub title: String,
    pub release_date: Option<NaiveDate>,
    pub poster_url: Option<String>,
}

impl From<TitleCard> for SearchSuggestion {
    fn from(card: TitleCard) -> Self {
        Self {
            id: card.id,
            title_type: card.title_type,
            title: card.title,
            release_date: card.release_date,
            poster_url: card.poster_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}
