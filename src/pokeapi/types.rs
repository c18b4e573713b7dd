//! PokéAPI response types and the minimal shape the core needs of an entity.

use serde::{Deserialize, Serialize};

/// What the cache and the favorites list need to know about a Pokémon.
pub trait Favoritable {
  fn id(&self) -> u32;
  fn name(&self) -> &str;
  fn primary_type(&self) -> &str;
  fn image_url(&self) -> &str;

  /// Name with every word capitalized, e.g. `mr-mime` -> `Mr-Mime`.
  fn formatted_name(&self) -> String {
    let mut out = String::with_capacity(self.name().len());
    let mut at_word_start = true;
    for c in self.name().chars() {
      if at_word_start {
        out.extend(c.to_uppercase());
      } else {
        out.extend(c.to_lowercase());
      }
      at_word_start = c == ' ' || c == '-';
    }
    out
  }

  /// Pokédex number, zero-padded to three digits.
  fn pokemon_number(&self) -> String {
    format!("#{:03}", self.id())
  }
}

/// A `{ name, url }` reference to another API resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
  pub name: String,
  pub url: String,
}

impl NamedResource {
  pub fn id(&self) -> Option<u32> {
    resource_id(&self.url)
  }
}

/// Numeric id from the last path segment, e.g. `.../pokemon/25/` -> 25.
pub fn resource_id(url: &str) -> Option<u32> {
  url
    .trim_end_matches('/')
    .rsplit('/')
    .next()
    .and_then(|segment| segment.parse().ok())
}

/// One page of `/pokemon`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonListResponse {
  pub count: u32,
  pub next: Option<String>,
  pub previous: Option<String>,
  pub results: Vec<NamedResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonTypeSlot {
  pub slot: u32,
  #[serde(rename = "type")]
  pub kind: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonStat {
  pub base_stat: u32,
  #[serde(default)]
  pub effort: u32,
  pub stat: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonAbility {
  pub ability: NamedResource,
  #[serde(default)]
  pub is_hidden: bool,
  #[serde(default)]
  pub slot: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
  pub front_default: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherSprites {
  #[serde(rename = "official-artwork", default)]
  pub official_artwork: Option<Artwork>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprites {
  pub front_default: Option<String>,
  #[serde(default)]
  pub other: Option<OtherSprites>,
}

/// `/pokemon/{id}`, trimmed to the fields the client uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonDetail {
  pub id: u32,
  pub name: String,
  #[serde(default)]
  pub height: u32,
  #[serde(default)]
  pub weight: u32,
  #[serde(default)]
  pub base_experience: Option<u32>,
  #[serde(default)]
  pub types: Vec<PokemonTypeSlot>,
  #[serde(default)]
  pub stats: Vec<PokemonStat>,
  #[serde(default)]
  pub abilities: Vec<PokemonAbility>,
  #[serde(default)]
  pub sprites: Sprites,
}

impl Favoritable for PokemonDetail {
  fn id(&self) -> u32 {
    self.id
  }

  fn name(&self) -> &str {
    &self.name
  }

  fn primary_type(&self) -> &str {
    self
      .types
      .iter()
      .min_by_key(|t| t.slot)
      .map_or("unknown", |t| t.kind.name.as_str())
  }

  fn image_url(&self) -> &str {
    self
      .sprites
      .other
      .as_ref()
      .and_then(|other| other.official_artwork.as_ref())
      .and_then(|art| art.front_default.as_deref())
      .or(self.sprites.front_default.as_deref())
      .unwrap_or_default()
  }
}
