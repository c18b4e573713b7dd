//! PokéAPI endpoints.

use crate::network::{Endpoint, HttpMethod, Parameters};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PokemonEndpoint {
  /// One page of the species list
  PokemonList { offset: u32, limit: u32 },
  PokemonDetail { id: u32 },
  /// A detail URL taken verbatim from a list result
  PokemonDetailByUrl { url: String },
}

impl Endpoint for PokemonEndpoint {
  fn path(&self) -> String {
    match self {
      Self::PokemonList { .. } => "/pokemon".to_string(),
      Self::PokemonDetail { id } => format!("/pokemon/{}", id),
      Self::PokemonDetailByUrl { .. } => String::new(),
    }
  }

  fn method(&self) -> HttpMethod {
    HttpMethod::Get
  }

  fn parameters(&self) -> Option<Parameters> {
    match self {
      Self::PokemonList { offset, limit } => Some(
        Parameters::new()
          .with("offset", *offset)
          .with("limit", *limit),
      ),
      Self::PokemonDetail { .. } | Self::PokemonDetailByUrl { .. } => None,
    }
  }

  fn absolute_url(&self) -> Option<String> {
    match self {
      Self::PokemonDetailByUrl { url } => Some(url.clone()),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::network::ParameterEncoding;

  const BASE: &str = "https://pokeapi.co/api/v2";

  #[test]
  fn test_list_is_paged_get() {
    let descriptor = PokemonEndpoint::PokemonList {
      offset: 20,
      limit: 10,
    }
    .descriptor();

    assert_eq!(descriptor.encoding(), ParameterEncoding::QueryString);
    let request = descriptor.to_http_request(BASE).expect("request");
    assert_eq!(
      request.url.as_str(),
      "https://pokeapi.co/api/v2/pokemon?offset=20&limit=10"
    );
  }

  #[test]
  fn test_detail_by_id() {
    let descriptor = PokemonEndpoint::PokemonDetail { id: 25 }.descriptor();
    assert_eq!(descriptor.url(BASE), "https://pokeapi.co/api/v2/pokemon/25");
    assert!(descriptor.parameters().is_none());
  }

  #[test]
  fn test_detail_by_url_ignores_base() {
    let descriptor = PokemonEndpoint::PokemonDetailByUrl {
      url: "https://mirror.example/api/v2/pokemon/25/".into(),
    }
    .descriptor();
    assert_eq!(
      descriptor.url(BASE),
      "https://mirror.example/api/v2/pokemon/25/"
    );
  }
}
