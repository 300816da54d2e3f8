use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::NaiveDate;
use pgvector::Vector;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, QueryBuilder};

use crate::{
    config::Config,
    db::store::{AnnNeighbor, TitleStore},
    error::{AppError, AppResult},
    models::{Genre, SearchSort, TitleCard, TitleType},
    query::{order_by_clause, PrefixQuery, Predicate, TitleFilter},
};

/// Columns selected for every title card, aliased against `titles t`
const CARD_COLUMNS: &str = "t.id, t.type, t.title, t.overview, t.release_date, t.rating, \
                            t.rating_count, t.popularity, t.poster_url, t.backdrop_url";

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// Acquiring a connection is bounded by the configured timeout so a saturated
/// or unreachable database surfaces as `StoreUnavailable` instead of hanging.
pub async fn create_pool(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect(&config.database_url)
        .await?;

    Ok(pool)
}

#[derive(Debug, FromRow)]
struct TitleRow {
    id: i64,
    #[sqlx(rename = "type")]
    title_type: String,
    title: String,
    overview: Option<String>,
    release_date: Option<NaiveDate>,
    rating: f64,
    rating_count: i32,
    popularity: Option<f64>,
    poster_url: Option<String>,
    backdrop_url: Option<String>,
}

impl TryFrom<TitleRow> for TitleCard {
    type Error = AppError;

    fn try_from(row: TitleRow) -> Result<Self, Self::Error> {
        Ok(TitleCard {
            id: row.id,
            title_type: row.title_type.parse()?,
            title: row.title,
            overview: row.overview,
            release_date: row.release_date,
            rating: row.rating,
            rating_count: row.rating_count,
            popularity: row.popularity,
            poster_url: row.poster_url,
            backdrop_url: row.backdrop_url,
        })
    }
}

#[derive(Debug, FromRow)]
struct NeighborRow {
    #[sqlx(flatten)]
    title: TitleRow,
    distance: f64,
}

fn into_cards(rows: Vec<TitleRow>) -> AppResult<Vec<TitleCard>> {
    rows.into_iter().map(TitleCard::try_from).collect()
}

/// Appends `WHERE` plus every predicate of the filter, joined with `AND`
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &TitleFilter) {
    builder.push(" WHERE TRUE");
    for predicate in filter.predicates() {
        builder.push(" AND ");
        match predicate {
            Predicate::Text(query) => push_text_match(builder, query),
            Predicate::ReleasedOnOrBefore(date) => {
                builder.push("t.release_date <= ").push_bind(*date);
            }
            Predicate::ReleasedOnOrAfter(date) => {
                builder.push("t.release_date >= ").push_bind(*date);
            }
            Predicate::TypeIs(title_type) => {
                builder.push("t.type = ").push_bind(title_type.as_str());
            }
            Predicate::RatingAtLeast(rating) => {
                builder.push("t.rating >= ").push_bind(*rating);
            }
            Predicate::RatingAtMost(rating) => {
                builder.push("t.rating <= ").push_bind(*rating);
            }
            Predicate::HasGenre(genre_id) => {
                builder
                    .push("EXISTS (SELECT 1 FROM title_genres tg WHERE tg.title_id = t.id AND tg.genre_id = ")
                    .push_bind(*genre_id)
                    .push(")");
            }
        }
    }
}

fn push_text_match(builder: &mut QueryBuilder<'_, Postgres>, query: &PrefixQuery) {
    builder
        .push("t.title_vector @@ to_tsquery('simple', ")
        .push_bind(query.to_tsquery())
        .push(")");
}

/// Typeahead candidates: filter, then the text match, then the row cap
fn text_search_query(
    query: &PrefixQuery,
    filter: &TitleFilter,
    limit: i64,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {CARD_COLUMNS} FROM titles t"));
    push_filter(&mut builder, filter);
    builder.push(" AND ");
    push_text_match(&mut builder, query);
    builder.push(" LIMIT ").push_bind(limit);
    builder
}

/// Count that stops after `cap` rows; the `LIMIT` must stay inside the subquery
fn capped_count_query(filter: &TitleFilter, cap: i64) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT count(*) FROM (SELECT 1 FROM titles t");
    push_filter(&mut builder, filter);
    builder.push(" LIMIT ").push_bind(cap).push(") capped");
    builder
}

fn sorted_page_query(
    filter: &TitleFilter,
    sort: SearchSort,
    limit: i64,
    offset: i64,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {CARD_COLUMNS} FROM titles t"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY ").push(order_by_clause(sort));
    builder.push(" LIMIT ").push_bind(limit);
    builder.push(" OFFSET ").push_bind(offset);
    builder
}

/// Nearest neighbours by cosine distance.
///
/// Ordering directly on the distance operator lets the HNSW index drive the scan.
fn ann_query() -> String {
    format!(
        "SELECT {CARD_COLUMNS}, (t.embedding <=> $1) AS distance \
         FROM titles t \
         WHERE t.embedding IS NOT NULL \
         ORDER BY t.embedding <=> $1 \
         LIMIT $2"
    )
}

/// Largest candidate list pgvector's HNSW scan accepts
const MAX_EF_SEARCH: i64 = 1000;

/// `hnsw.ef_search` needed for an index scan to yield `k` rows.
///
/// The scan never returns more than `ef_search` rows, whatever the `LIMIT`.
fn ef_search_for(k: i64) -> i64 {
    k.clamp(1, MAX_EF_SEARCH)
}

/// Title store backed by PostgreSQL with pgvector and a GIN full-text index
#[derive(Clone)]
pub struct PgTitleStore {
    pool: PgPool,
    embedding_dim: usize,
}

impl PgTitleStore {
    pub fn new(pool: PgPool, embedding_dim: usize) -> Self {
        Self {
            pool,
            embedding_dim,
        }
    }
}

#[async_trait::async_trait]
impl TitleStore for PgTitleStore {
    async fn embedding_and_type(&self, title_id: i64) -> AppResult<(Vec<f32>, TitleType)> {
        let row: Option<(Option<Vector>, String)> =
            sqlx::query_as("SELECT embedding, type FROM titles WHERE id = $1")
                .bind(title_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((Some(embedding), title_type)) => {
                let embedding = embedding.to_vec();
                if embedding.len() != self.embedding_dim {
                    return Err(AppError::Internal(format!(
                        "Title {} embedding has {} dimensions, expected {}",
                        title_id,
                        embedding.len(),
                        self.embedding_dim
                    )));
                }
                Ok((embedding, title_type.parse()?))
            }
            Some((None, _)) => {
                tracing::debug!(title_id, "Title has no embedding");
                Err(AppError::title_not_found(title_id))
            }
            None => Err(AppError::title_not_found(title_id)),
        }
    }

    async fn ann_nearest(&self, embedding: &[f32], k: i64) -> AppResult<Vec<AnnNeighbor>> {
        // The setting is transaction-local so pooled connections keep their defaults.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT set_config('hnsw.ef_search', $1, true)")
            .bind(ef_search_for(k).to_string())
            .execute(&mut *tx)
            .await?;

        let rows: Vec<NeighborRow> = sqlx::query_as(&ann_query())
            .bind(Vector::from(embedding.to_vec()))
            .bind(k)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        rows.into_iter()
            .map(|row| {
                Ok(AnnNeighbor {
                    card: TitleCard::try_from(row.title)?,
                    distance: row.distance,
                })
            })
            .collect()
    }

    async fn genres_of(&self, title_ids: &[i64]) -> AppResult<HashMap<i64, HashSet<i64>>> {
        let rows: Vec<(i64, i64)> =
            sqlx::query_as("SELECT title_id, genre_id FROM title_genres WHERE title_id = ANY($1)")
                .bind(title_ids)
                .fetch_all(&self.pool)
                .await?;

        let mut genres: HashMap<i64, HashSet<i64>> = HashMap::new();
        for (title_id, genre_id) in rows {
            genres.entry(title_id).or_default().insert(genre_id);
        }
        Ok(genres)
    }

    async fn max_popularity(&self) -> AppResult<Option<f64>> {
        let max: Option<f64> = sqlx::query_scalar("SELECT max(popularity) FROM titles")
            .fetch_one(&self.pool)
            .await?;
        Ok(max)
    }

    async fn text_search_match(
        &self,
        query: &PrefixQuery,
        filter: &TitleFilter,
        limit: i64,
    ) -> AppResult<Vec<TitleCard>> {
        let mut builder = text_search_query(query, filter, limit);
        let rows: Vec<TitleRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        into_cards(rows)
    }

    async fn count_match(&self, filter: &TitleFilter, cap: i64) -> AppResult<i64> {
        let mut builder = capped_count_query(filter, cap);
        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn filtered_sorted_page(
        &self,
        filter: &TitleFilter,
        sort: SearchSort,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<TitleCard>> {
        let mut builder = sorted_page_query(filter, sort, limit, offset);
        let rows: Vec<TitleRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        into_cards(rows)
    }

    async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM genres")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id, name)| Genre { id, name }).collect())
    }

    async fn estimated_title_count(&self) -> AppResult<i64> {
        // Live-tuple statistics first, planner estimate as fallback; never a full count.
        let estimate: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT coalesce(
                (SELECT n_live_tup::float8
                 FROM pg_stat_user_tables
                 WHERE relname = 'titles' AND schemaname = current_schema()),
                (SELECT c.reltuples::float8
                 FROM pg_class c
                 JOIN pg_namespace n ON n.oid = c.relnamespace
                 WHERE c.relname = 'titles' AND n.nspname = current_schema())
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(estimate.map(|e| e.round().max(0.0) as i64).unwrap_or(0))
    }
}
