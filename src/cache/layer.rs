//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use std::sync::Arc;

use super::storage::CacheStorage;
use super::traits::{CacheResult, Cacheable, Clock, QueryKey, SystemClock};
use super::CacheError;

/// Cache layer that manages expiry and network fetching.
///
/// The storage lock is only taken for individual reads and writes, never
/// across the fetcher's await. Two concurrent misses for the same key both
/// fetch and the later write wins.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  clock: Arc<dyn Clock>,
  /// How long cached data is served before refetching
  ttl: Duration,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      clock: Arc::new(SystemClock),
      ttl: Duration::minutes(5),
    }
  }

  /// Set the time-to-live for cached data.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Replace the time source.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  fn is_fresh(&self, fetched_at: DateTime<Utc>) -> bool {
    self.clock.now() - fetched_at < self.ttl
  }

  /// Fetch with a cache-first strategy.
  ///
  /// 1. Fresh entry under the key: return it, fetcher is not called
  /// 2. Otherwise call the fetcher; its error is returned as-is and nothing is stored
  /// 3. Store the result (if it is cacheable) stamped with the current time
  pub async fn fetch<K, T, E, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>, E>
  where
    K: QueryKey,
    T: Cacheable,
    E: From<CacheError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let hash = key.cache_hash();

    if let Some(cached) = self.storage.get::<T>(&hash)? {
      if self.is_fresh(cached.fetched_at) {
        tracing::debug!(key = %key.description(), "cache hit");
        return Ok(CacheResult::from_cache(cached.payload, cached.fetched_at));
      }
      tracing::debug!(key = %key.description(), "cache entry expired");
    }

    let data = fetcher().await?;

    if data.is_cacheable() {
      self.storage.store(&hash, &data, self.clock.now())?;
    }

    Ok(CacheResult::from_network(data))
  }

  /// Drop any cached entry for the key.
  pub fn invalidate<K: QueryKey>(&self, key: &K) {
    tracing::debug!(key = %key.description(), "cache invalidated");
    self.storage.remove(&key.cache_hash());
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      clock: Arc::clone(&self.clock),
      ttl: self.ttl,
    }
  }
}
