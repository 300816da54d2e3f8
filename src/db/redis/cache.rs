use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::error::AppResult;

/// Keys for catalog data that tolerates brief staleness.
///
/// Ranking results are never cached: similar, suggest and search always read
/// fresh data from the title store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Genres,
    Home,
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Genres => write!(f, "catalog:genres"),
            CacheKey::Home => write!(f, "catalog:home"),
        }
    }
}

/// Creates a Redis client for caching
///
/// No connection is made here; connections are opened lazily per operation.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Pending writes held while Redis is slow or down; further writes are dropped
const WRITE_QUEUE_CAPACITY: usize = 256;

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Cache handler for storing and retrieving data from Redis
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    timeout: Duration,
    write_tx: mpsc::Sender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task and waits until pending writes are flushed
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Cache writer task ended abnormally");
        }
    }
}

impl Cache {
    /// Creates a new Cache instance with an async write background task
    ///
    /// Writes are handed to a spawned task so filling the cache never delays
    /// the response that produced the value. `timeout` bounds both connecting
    /// and each command, so an unresponsive Redis reads as a miss.
    pub fn new(redis_client: Client, timeout: Duration) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        let task = tokio::spawn(async move {
            Self::cache_writer_task(client, timeout, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            timeout,
            write_tx,
        };

        (cache, CacheWriterHandle { shutdown_tx, task })
    }

    /// Background task that drains cache write messages
    ///
    /// On shutdown, flushes every queued message before exiting.
    async fn cache_writer_task(
        client: Client,
        timeout: Duration,
        mut write_rx: mpsc::Receiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, timeout, msg).await {
                        tracing::warn!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Cache writer shutting down, flushing remaining writes");

                    write_rx.close();
                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_redis(&client, timeout, msg).await {
                            tracing::warn!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    async fn connect(
        client: &Client,
        timeout: Duration,
    ) -> AppResult<redis::aio::MultiplexedConnection> {
        let conn = client
            .get_multiplexed_async_connection_with_timeouts(timeout, timeout)
            .await?;
        Ok(conn)
    }

    async fn write_to_redis(
        client: &Client,
        timeout: Duration,
        msg: CacheWriteMessage,
    ) -> AppResult<()> {
        let mut conn = Self::connect(client, timeout).await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Retrieves a value from the cache by key
    ///
    /// Returns `None` on a miss.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = Self::connect(&self.redis_client, self.timeout).await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Queues a value for storage without waiting for Redis
    ///
    /// Returns `false` when the write was dropped, either because the value
    /// could not be serialized or because the write queue is full.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) -> bool {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return false;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl,
        };

        match self.write_tx.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(msg)) => {
                tracing::debug!(key = %msg.key, "Cache write queue full, dropping write");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::error!("Cache writer stopped, dropping write");
                false
            }
        }
    }
}
