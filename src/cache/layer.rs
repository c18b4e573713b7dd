//! Cache layer that decides between a cached value and a network fetch.

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::debug;

use super::manager::Cache;
use super::traits::CacheResult;

/// Cache-first fetch policy.
///
/// This layer sits between the application and the network client. It owns
/// no state of its own beyond a handle to the shared [`Cache`].
#[derive(Debug, Clone)]
pub struct CacheLayer {
  cache: Cache,
}

impl CacheLayer {
  /// Create a new cache layer over the given cache.
  pub fn new(cache: Cache) -> Self {
    Self { cache }
  }

  pub fn cache(&self) -> &Cache {
    &self.cache
  }

  /// Fetch a value with a cache-first strategy.
  ///
  /// 1. If `key` is younger than `max_age` and decodes as `T`, return it
  /// 2. Otherwise call `fetcher`, store the result under `key`, return it
  /// 3. If `fetcher` fails, return its error untouched
  ///
  /// A failed fetch never writes to the cache, so an existing entry
  /// survives transient network errors.
  pub async fn fetch<T, E, F, Fut>(
    &self,
    key: &str,
    max_age: Duration,
    fetcher: F,
  ) -> Result<CacheResult<T>, E>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    if let Some((data, cached_at)) = self.cache.get_fresh::<T>(key, max_age) {
      debug!(key, "Cache hit");
      return Ok(CacheResult::from_cache(data, cached_at));
    }

    debug!(key, "Cache miss, fetching from network");
    let data = fetcher().await?;
    self.cache.set(&data, key);
    Ok(CacheResult::from_network(data))
  }
}
