use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{SearchQuery, SearchResult, SearchSuggestion},
    routes::{
        extract::{ApiJson, ApiQuery},
        AppState,
    },
};

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    q: String,
}

/// Handler for typeahead suggestions
pub async fn suggest(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<SuggestParams>,
) -> AppResult<Json<Vec<SearchSuggestion>>> {
    let suggestions = state.search.suggest(&params.q).await?;

    tracing::debug!(
        request_id = %request_id,
        query_len = params.q.len(),
        returned = suggestions.len(),
        "Suggestions served"
    );

    Ok(Json(suggestions))
}

/// Handler for faceted title search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(query): ApiJson<SearchQuery>,
) -> AppResult<Json<SearchResult>> {
    query.validate()?;

    tracing::info!(
        request_id = %request_id,
        has_text = !query.text().is_empty(),
        sort = ?query.sort,
        limit = query.limit,
        offset = query.offset,
        "Processing search request"
    );

    let result = state.search.search(&query).await?;
    Ok(Json(result))
}
