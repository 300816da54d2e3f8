//! Title discovery API: "more like this" recommendations, typeahead
//! suggestions, faceted search and home page listings over a PostgreSQL
//! catalog with pgvector embeddings.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod query;
pub mod routes;
pub mod services;
