//! Typed cache over a [`SerializedStore`], with per-key write timestamps.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::storage::{SerializedStore, StoreValue};

/// Prefix separating timestamp entries from payload entries in the store.
pub const CACHE_TIME_PREFIX: &str = "cache_time_";

/// Well-known cache keys.
pub struct CacheKey;

impl CacheKey {
  pub const POKEMON_LIST: &'static str = "pokemon_list";
  pub const POKEMON_DETAIL: &'static str = "pokemon_detail_";

  /// Key for one page of the Pokémon list.
  pub fn pokemon_list(offset: u32, limit: u32) -> String {
    format!("{}_{}_{}", Self::POKEMON_LIST, offset, limit)
  }

  pub fn pokemon_detail(id: u32) -> String {
    format!("{}{}", Self::POKEMON_DETAIL, id)
  }
}

/// Default freshness windows.
pub struct CacheMaxAge;

impl CacheMaxAge {
  pub fn pokemon_list() -> Duration {
    Duration::hours(24)
  }

  pub fn pokemon_detail() -> Duration {
    Duration::days(7)
  }
}

/// Why a `set` was dropped.
#[derive(Debug, Error)]
pub enum CacheWriteError {
  #[error("failed to serialize value: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("failed to write to store: {0}")]
  Store(color_eyre::Report),
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;
type WriteFailureHook = Arc<dyn Fn(&str, &CacheWriteError) + Send + Sync>;

/// Typed get/set/remove/clear over a flat store, plus freshness checks.
///
/// Every payload lives under its key and the time it was written lives under
/// `cache_time_<key>`. Both are written in one store call so a reader never
/// sees one without the other. Read failures of any kind are reported as a
/// miss and write failures drop the write.
#[derive(Clone)]
pub struct Cache {
  store: Arc<dyn SerializedStore>,
  clock: Clock,
  on_write_failure: Option<WriteFailureHook>,
}

impl Cache {
  pub fn new(store: impl SerializedStore + 'static) -> Self {
    Self::from_shared(Arc::new(store))
  }

  pub fn from_shared(store: Arc<dyn SerializedStore>) -> Self {
    Self {
      store,
      clock: Arc::new(Utc::now),
      on_write_failure: None,
    }
  }

  /// Replace the time source used for write timestamps and freshness checks.
  pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
    self.clock = Arc::new(clock);
    self
  }

  /// Observe writes that were dropped. The drop itself still happens.
  pub fn with_write_failure_hook(
    mut self,
    hook: impl Fn(&str, &CacheWriteError) + Send + Sync + 'static,
  ) -> Self {
    self.on_write_failure = Some(Arc::new(hook));
    self
  }

  fn time_key(key: &str) -> String {
    format!("{}{}", CACHE_TIME_PREFIX, key)
  }

  /// When `key` was last written, if it has a usable timestamp.
  pub fn written_at(&self, key: &str) -> Option<DateTime<Utc>> {
    let secs = match self.store.get(&Self::time_key(key)) {
      Ok(value) => value?.as_timestamp()?,
      Err(e) => {
        debug!(key, error = %e, "Cache timestamp read failed");
        return None;
      }
    };

    if secs <= 0.0 || !secs.is_finite() {
      return None;
    }

    let micros = (secs * 1_000_000.0).round() as i64;
    DateTime::from_timestamp_micros(micros)
  }

  /// Decode the value stored under `key`, or `None` on any failure.
  pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    self.written_at(key)?;
    self.decode(key)
  }

  /// Decode `key` only if it is younger than `max_age`, with its write time.
  ///
  /// The timestamp is read once and both the freshness decision and the
  /// returned write time come from that single read.
  pub fn get_fresh<T: DeserializeOwned>(
    &self,
    key: &str,
    max_age: Duration,
  ) -> Option<(T, DateTime<Utc>)> {
    let written_at = self.written_at(key)?;
    if !self.is_fresh(written_at, max_age) {
      return None;
    }

    let value = self.decode(key)?;
    Some((value, written_at))
  }

  fn decode<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let payload = match self.store.get(key) {
      Ok(Some(StoreValue::Data(bytes))) => bytes,
      Ok(_) => return None,
      Err(e) => {
        debug!(key, error = %e, "Cache payload read failed");
        return None;
      }
    };

    match serde_json::from_slice(&payload) {
      Ok(value) => Some(value),
      Err(e) => {
        debug!(key, error = %e, "Cached payload did not decode, treating as miss");
        None
      }
    }
  }

  /// Store `value` under `key` and stamp it with the current time.
  pub fn set<T: Serialize + ?Sized>(&self, value: &T, key: &str) {
    if let Err(e) = self.try_set(value, key) {
      warn!(key, error = %e, "Dropping cache write");
      if let Some(hook) = &self.on_write_failure {
        hook(key, &e);
      }
    }
  }

  fn try_set<T: Serialize + ?Sized>(&self, value: &T, key: &str) -> Result<(), CacheWriteError> {
    let payload = serde_json::to_vec(value)?;
    let now = (self.clock)();
    let secs = now.timestamp_micros() as f64 / 1_000_000.0;

    self
      .store
      .set_all(&[
        (key.to_string(), StoreValue::Data(payload)),
        (Self::time_key(key), StoreValue::Timestamp(secs)),
      ])
      .map_err(CacheWriteError::Store)
  }

  /// Delete the payload and timestamp for `key`.
  pub fn remove(&self, key: &str) {
    if let Err(e) = self
      .store
      .remove_all(&[key.to_string(), Self::time_key(key)])
    {
      warn!(key, error = %e, "Failed to remove cache entry");
    }
  }

  /// Remove every entry that carries a cache timestamp.
  pub fn clear(&self) {
    let keys = match self.store.keys() {
      Ok(keys) => keys,
      Err(e) => {
        warn!(error = %e, "Failed to list cache keys");
        return;
      }
    };

    let doomed: Vec<String> = keys
      .iter()
      .filter_map(|k| k.strip_prefix(CACHE_TIME_PREFIX))
      .flat_map(|original| [original.to_string(), Self::time_key(original)])
      .collect();

    if doomed.is_empty() {
      return;
    }

    debug!(entries = doomed.len() / 2, "Clearing cache");
    if let Err(e) = self.store.remove_all(&doomed) {
      warn!(error = %e, "Failed to clear cache");
    }
  }

  /// True iff `key` has a timestamp and is younger than `max_age`.
  pub fn is_cache_valid(&self, key: &str, max_age: Duration) -> bool {
    match self.written_at(key) {
      Some(written_at) => self.is_fresh(written_at, max_age),
      None => false,
    }
  }

  fn is_fresh(&self, written_at: DateTime<Utc>, max_age: Duration) -> bool {
    (self.clock)() - written_at < max_age
  }
}

impl fmt::Debug for Cache {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Cache")
      .field("has_write_failure_hook", &self.on_write_failure.is_some())
      .finish_non_exhaustive()
  }
}
