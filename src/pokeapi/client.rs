use crate::network::{NetworkError, NetworkService};

use super::endpoints::PokemonEndpoint;
use super::types::{PokemonDetail, PokemonListResponse};

/// PokéAPI client without caching.
#[derive(Clone)]
pub struct PokeApiClient {
  network: NetworkService,
}

impl PokeApiClient {
  pub fn new(network: NetworkService) -> Self {
    Self { network }
  }

  /// Get one page of the species list
  pub async fn get_pokemon_list(
    &self,
    offset: u32,
    limit: u32,
  ) -> Result<PokemonListResponse, NetworkError> {
    self
      .network
      .request(&PokemonEndpoint::PokemonList { offset, limit })
      .await
  }

  /// Get a single Pokémon by id
  pub async fn get_pokemon_detail(&self, id: u32) -> Result<PokemonDetail, NetworkError> {
    self
      .network
      .request(&PokemonEndpoint::PokemonDetail { id })
      .await
  }

  /// Get a single Pokémon from a resource URL
  pub async fn get_pokemon_detail_by_url(&self, url: &str) -> Result<PokemonDetail, NetworkError> {
    self
      .network
      .request(&PokemonEndpoint::PokemonDetailByUrl {
        url: url.to_string(),
      })
      .await
  }
}
