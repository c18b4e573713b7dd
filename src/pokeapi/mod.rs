//! PokéAPI endpoints, response types and the cached client on top of them.

pub mod cached_client;
pub mod client;
pub mod endpoints;
pub mod types;

pub use cached_client::CachedPokeApiClient;
pub use client::PokeApiClient;
pub use endpoints::PokemonEndpoint;
pub use types::{
  Favoritable, NamedResource, PokemonDetail, PokemonListResponse, PokemonStat, PokemonTypeSlot,
};
