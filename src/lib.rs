//! Pokédex client core.
//!
//! - [`network`] performs typed HTTP calls with two compounding retry layers
//! - [`cache`] stores JSON payloads with write timestamps for age checks
//! - [`pokeapi`] combines both into cache-first fetches of PokéAPI resources

pub mod cache;
pub mod config;
pub mod network;
pub mod pokeapi;
