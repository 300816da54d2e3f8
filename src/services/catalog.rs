use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    cached,
    db::{Cache, CacheKey, TitleStore},
    error::{AppError, AppResult},
    models::{Genre, HomeResponse, HomeSection, SearchSort},
    query::TitleFilter,
    services::today,
};

pub const HOME_SECTION_SIZE: i64 = 12;

/// Home page rows and the genre list
///
/// These listings tolerate brief staleness, so when a cache is configured
/// they are served read-through from Redis.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn TitleStore>,
    cache: Option<Cache>,
    cache_ttl: u64,
}

impl CatalogService {
    pub fn new(store: Arc<dyn TitleStore>, cache: Option<Cache>, cache_ttl: u64) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
        }
    }

    pub async fn home(&self) -> AppResult<HomeResponse> {
        let store = Arc::clone(&self.store);
        let today = today();
        cached!(self.cache, CacheKey::Home, self.cache_ttl, async move {
            build_home(store.as_ref(), today).await
        })
    }

    /// All genres, case-insensitively by name
    pub async fn genres(&self) -> AppResult<Vec<Genre>> {
        let store = Arc::clone(&self.store);
        cached!(self.cache, CacheKey::Genres, self.cache_ttl, async move {
            let mut genres = store.list_genres().await?;
            sort_genres(&mut genres);
            Ok::<_, AppError>(genres)
        })
    }
}

fn sort_genres(genres: &mut [Genre]) {
    genres.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then(a.id.cmp(&b.id))
    });
}

/// Builds the three home rows and the size estimate concurrently
///
/// Only "New Releases" is bounded by the release date; the other rows list
/// the catalog as stored.
pub async fn build_home(store: &dyn TitleStore, today: NaiveDate) -> AppResult<HomeResponse> {
    let all = TitleFilter::all();
    let released = TitleFilter::released_by(today);

    let (trending, new_releases, top_rated, estimate) = tokio::try_join!(
        store.filtered_sorted_page(&all, SearchSort::Popularity, HOME_SECTION_SIZE, 0),
        store.filtered_sorted_page(&released, SearchSort::Newest, HOME_SECTION_SIZE, 0),
        store.filtered_sorted_page(&all, SearchSort::Rating, HOME_SECTION_SIZE, 0),
        store.estimated_title_count(),
    )?;

    tracing::debug!(
        trending = trending.len(),
        new_releases = new_releases.len(),
        top_rated = top_rated.len(),
        estimate,
        "Home sections loaded"
    );

    Ok(HomeResponse {
        sections: vec![
            HomeSection {
                title: "Trending Now".to_string(),
                items: trending,
            },
            HomeSection {
                title: "New Releases".to_string(),
                items: new_releases,
            },
            HomeSection {
                title: "Top Rated".to_string(),
                items: top_rated,
            },
        ],
        total_count_estimate: estimate.max(0),
    })
}
