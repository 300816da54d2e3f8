use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::TitleCard,
    routes::{
        extract::{ApiPath, ApiQuery},
        AppState,
    },
};

pub const DEFAULT_SIMILAR_LIMIT: i64 = 12;
pub const MAX_SIMILAR_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    limit: Option<i64>,
}

impl SimilarParams {
    fn limit(&self) -> AppResult<usize> {
        let limit = self.limit.unwrap_or(DEFAULT_SIMILAR_LIMIT);
        if !(1..=MAX_SIMILAR_LIMIT).contains(&limit) {
            return Err(AppError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_SIMILAR_LIMIT
            )));
        }
        Ok(limit as usize)
    }
}

/// Handler for the "more like this" endpoint
pub async fn similar(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    ApiPath(title_id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<SimilarParams>,
) -> AppResult<Json<Vec<TitleCard>>> {
    let limit = params.limit()?;

    tracing::info!(
        request_id = %request_id,
        title_id,
        limit,
        "Processing similar titles request"
    );

    let titles = state.recommendations.similar(title_id, limit).await?;

    tracing::info!(
        request_id = %request_id,
        title_id,
        returned = titles.len(),
        "Similar titles completed"
    );

    Ok(Json(titles))
}
