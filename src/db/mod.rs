pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;

pub use memory::{MemoryTitleStore, TitleRecord};
pub use postgres::{create_pool, PgTitleStore};
pub use self::redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
pub use store::{AnnNeighbor, TitleStore};
