use std::sync::Arc;

use axum::{
    http::{Method, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    db::{Cache, TitleStore},
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{CatalogService, RecommendationService, SearchService},
};

pub mod catalog;
pub mod extract;
pub mod recommendations;
pub mod titles;

/// Services shared by every handler
pub struct AppState {
    pub recommendations: RecommendationService,
    pub search: SearchService,
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(store: Arc<dyn TitleStore>, cache: Option<Cache>, cache_ttl: u64) -> Self {
        Self {
            recommendations: RecommendationService::new(Arc::clone(&store)),
            search: SearchService::new(Arc::clone(&store)),
            catalog: CatalogService::new(store, cache, cache_ttl),
        }
    }
}

/// Creates the application router with all routes
///
/// The request id layer runs outermost so every request span already carries
/// its id.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .with_state(Arc::new(state))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(cors),
        )
}

/// API routes under /api
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/titles/:id/similar", get(recommendations::similar))
        .route("/search/suggest", get(titles::suggest))
        .route("/search", post(titles::search))
        .route("/home", get(catalog::home))
        .route("/genres", get(catalog::genres))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
