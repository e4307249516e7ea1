/// Read-through caching over an optional Redis cache.
///
/// Returns the cached value when present. Otherwise awaits `$block` (a future of
/// `AppResult<T>`), queues the value for caching and returns it. Errors from the block
/// are propagated and never cached; a failing or absent cache reads as a miss.
///
/// # Arguments
/// * `$cache`: an `Option<&Cache>`
/// * `$key`: the `CacheKey` to read and write
/// * `$ttl`: time-to-live in seconds
/// * `$block`: the future computing the value on a miss
///
/// # Example
/// ```rust,ignore
/// cached!(self.cache.as_ref(), CacheKey::Trending(medium), ttl, async move {
///     gateway.search(request).await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let cache: Option<&$crate::db::Cache> = $cache;
        let key: $crate::db::CacheKey = $key;

        let hit = match cache {
            Some(cache) => cache.lookup(&key).await,
            None => None,
        };

        match hit {
            Some(cached) => Ok(cached),
            None => {
                let value = $block.await?;
                if let Some(cache) = cache {
                    cache.set_in_background(&key, &value, $ttl);
                }
                Ok(value)
            }
        }
    }};
}
