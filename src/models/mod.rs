use serde::{Deserialize, Serialize};

pub mod search;
pub mod title;

pub use search::{SearchQuery, SearchResult, SearchSort};
pub use title::{Genre, SearchSuggestion, TitleCard, TitleType};

// ============================================================================
// Home Page Types
// ============================================================================

/// A named row of titles on the home page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HomeSection {
    pub title: String,
    pub items: Vec<TitleCard>,
}

/// Home page payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HomeResponse {
    pub sections: Vec<HomeSection>,
    /// Planner-statistics estimate of the catalog size, not an exact count
    pub total_count_estimate: i64,
}
