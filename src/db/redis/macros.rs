/// Read-through caching for catalog lookups.
///
/// Returns the cached value when present. Otherwise awaits `$block`, queues the
/// result for a background cache write and returns it. A cache that cannot be
/// reached is logged and treated as a miss, so Redis trouble never fails a
/// request. `$cache` is an `Option<Cache>`; `None` always computes.
///
/// # Arguments
/// * `$cache`: `Option<Cache>` exposing `get_from_cache` and `set_in_background`.
/// * `$key`: The `CacheKey` for the value.
/// * `$ttl`: Time-to-live in seconds.
/// * `$block`: Future computing the value on a miss.
///
/// # Example
/// ```rust,ignore
/// let genres: Vec<Genre> = cached!(self.cache, CacheKey::Genres, ttl, async move {
///     store.list_genres().await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        let hit = match &$cache {
            Some(cache) => match cache.get_from_cache(&key).await {
                Ok(hit) => hit,
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Cache read failed, falling back to store");
                    None
                }
            },
            None => None,
        };

        match hit {
            Some(cached) => Ok(cached),
            None => match $block.await {
                Ok(value) => {
                    if let Some(cache) = &$cache {
                        cache.set_in_background(&key, &value, $ttl);
                    }
                    Ok(value)
                }
                Err(e) => Err(e),
            },
        }
    }};
}
