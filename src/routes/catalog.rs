use std::sync::Arc;

use axum::{extract::State, Extension, Json};

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{Genre, HomeResponse},
    routes::AppState,
};

/// Handler for the home page sections
pub async fn home(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<HomeResponse>> {
    tracing::debug!(request_id = %request_id, "Loading home sections");
    let home = state.catalog.home().await?;
    Ok(Json(home))
}

pub async fn genres(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<Vec<Genre>>> {
    tracing::debug!(request_id = %request_id, "Loading genres");
    let genres = state.catalog.genres().await?;
    Ok(Json(genres))
}
