pub mod catalog;
pub mod recommendations;
pub mod scoring;
pub mod search;

pub use catalog::CatalogService;
pub use recommendations::RecommendationService;
pub use search::SearchService;

/// Current UTC calendar date, the upper bound for "released" titles
pub fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}
