//! Cached PokéAPI client that wraps PokeApiClient with cache-first fetching.

use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use futures::{StreamExt, TryStreamExt};
use tracing::debug;

use crate::cache::{
  Cache, CacheKey, CacheLayer, CacheMaxAge, MemoryStore, NoopStore, SerializedStore, SqliteStore,
};
use crate::config::Config;
use crate::network::{NetworkError, NetworkService};

use super::client::PokeApiClient;
use super::types::{resource_id, PokemonDetail, PokemonListResponse};

/// Detail requests in flight at once when expanding a list page.
const DETAIL_CONCURRENCY: usize = 4;

/// PokéAPI client with transparent caching.
///
/// Fresh cache entries are returned without touching the network. Anything
/// else goes to the network and, on success, refreshes the cache. Network
/// errors are returned as-is; a stale entry is never served in their place.
#[derive(Clone)]
pub struct CachedPokeApiClient {
  inner: PokeApiClient,
  cache: CacheLayer,
  list_max_age: Duration,
  detail_max_age: Duration,
}

impl CachedPokeApiClient {
  pub fn new(network: NetworkService, cache: Cache) -> Self {
    Self {
      inner: PokeApiClient::new(network),
      cache: CacheLayer::new(cache),
      list_max_age: CacheMaxAge::pokemon_list(),
      detail_max_age: CacheMaxAge::pokemon_detail(),
    }
  }

  /// Build the client described by `config`.
  ///
  /// With `persist` off the cache lives in memory for this process only.
  pub fn from_config(config: &Config, persist: bool) -> Result<Self> {
    let network = NetworkService::new(config.network.clone())
      .map_err(|e| eyre!("Failed to create network client: {}", e))?;

    let store: Box<dyn SerializedStore> = if !config.cache.enabled {
      Box::new(NoopStore)
    } else if !persist {
      Box::new(MemoryStore::new())
    } else {
      match &config.cache.path {
        Some(path) => Box::new(SqliteStore::open_at(path)?),
        None => Box::new(SqliteStore::open()?),
      }
    };

    Ok(Self::new(network, Cache::from_shared(store.into())))
  }

  pub fn with_max_ages(mut self, list: Duration, detail: Duration) -> Self {
    self.list_max_age = list;
    self.detail_max_age = detail;
    self
  }

  pub fn cache(&self) -> &Cache {
    self.cache.cache()
  }

  /// Get one page of the species list, cached for a day.
  pub async fn fetch_pokemon_list(
    &self,
    offset: u32,
    limit: u32,
  ) -> Result<PokemonListResponse, NetworkError> {
    let key = CacheKey::pokemon_list(offset, limit);

    let result = self
      .cache
      .fetch(&key, self.list_max_age, || {
        self.inner.get_pokemon_list(offset, limit)
      })
      .await?;

    Ok(result.data)
  }

  /// Get a single Pokémon by id, cached for a week.
  pub async fn fetch_pokemon_detail(&self, id: u32) -> Result<PokemonDetail, NetworkError> {
    let key = CacheKey::pokemon_detail(id);

    let result = self
      .cache
      .fetch(&key, self.detail_max_age, || self.inner.get_pokemon_detail(id))
      .await?;

    Ok(result.data)
  }

  /// Get a single Pokémon from a resource URL.
  ///
  /// URLs ending in a numeric id share the cache entry of that id. Others
  /// always go to the network.
  pub async fn fetch_pokemon_detail_by_url(&self, url: &str) -> Result<PokemonDetail, NetworkError> {
    let Some(id) = resource_id(url) else {
      debug!(url, "No id in URL, bypassing cache");
      return self.inner.get_pokemon_detail_by_url(url).await;
    };

    let key = CacheKey::pokemon_detail(id);
    let result = self
      .cache
      .fetch(&key, self.detail_max_age, || {
        self.inner.get_pokemon_detail_by_url(url)
      })
      .await?;

    Ok(result.data)
  }

  /// Get a list page and the details of every entry on it, in list order.
  pub async fn fetch_pokemon_page_with_details(
    &self,
    offset: u32,
    limit: u32,
  ) -> Result<Vec<PokemonDetail>, NetworkError> {
    let page = self.fetch_pokemon_list(offset, limit).await?;

    futures::stream::iter(page.results)
      .map(|entry| async move { self.fetch_pokemon_detail_by_url(&entry.url).await })
      .buffered(DETAIL_CONCURRENCY)
      .try_collect()
      .await
  }
}
