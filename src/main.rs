use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pokedex::cache::{CacheKey, CacheMaxAge};
use pokedex::config::Config;
use pokedex::pokeapi::{CachedPokeApiClient, Favoritable, PokemonDetail};

#[derive(Parser, Debug)]
#[command(name = "pokedex")]
#[command(about = "A cache-first command line client for PokéAPI")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/pokedex/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Keep the cache in memory for this run only
  #[arg(long, global = true)]
  no_persist: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List one page of Pokémon
  List {
    #[arg(long, default_value_t = 0)]
    offset: u32,
    #[arg(long, default_value_t = 20)]
    limit: u32,
    /// Fetch the detail of every entry on the page
    #[arg(long)]
    details: bool,
  },
  /// Show a single Pokémon by id or resource URL
  Detail {
    #[arg(value_name = "ID|URL")]
    target: String,
  },
  /// Inspect or reset the local cache
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
  /// Remove every cached entry
  Clear,
  /// Show when a key was written and whether it is still fresh
  Status {
    key: String,
    /// Age limit in seconds (defaults to the limit for the key's kind)
    #[arg(long)]
    max_age_secs: Option<i64>,
  },
}

fn setup_logging() -> Option<WorkerGuard> {
  let filter = EnvFilter::try_from_env("POKEDEX_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  // Without a data directory there is nowhere to write logs; stay silent
  let log_dir = dirs::data_dir()?.join("pokedex").join("logs");
  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
    log_dir,
    "pokedex.log",
  ));

  tracing_subscriber::registry()
    .with(fmt::layer().with_ansi(false).with_writer(writer))
    .with(filter)
    .init();

  Some(guard)
}

fn print_detail(detail: &PokemonDetail) {
  println!("{} {}", detail.pokemon_number(), detail.formatted_name());
  let types: Vec<&str> = detail.types.iter().map(|t| t.kind.name.as_str()).collect();
  println!("  types:  {}", types.join(", "));
  println!("  height: {}  weight: {}", detail.height, detail.weight);
  for stat in &detail.stats {
    println!("  {:<16} {}", stat.stat.name, stat.base_stat);
  }
  if !detail.image_url().is_empty() {
    println!("  image:  {}", detail.image_url());
  }
}

fn default_max_age(key: &str) -> chrono::Duration {
  if key.starts_with(CacheKey::POKEMON_DETAIL) {
    CacheMaxAge::pokemon_detail()
  } else {
    CacheMaxAge::pokemon_list()
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = setup_logging();

  let config = Config::load(args.config.as_deref())?;
  info!(base_url = %config.network.base_url, persist = !args.no_persist, "Starting");

  let client = CachedPokeApiClient::from_config(&config, !args.no_persist)?;

  match args.command {
    Command::List {
      offset,
      limit,
      details,
    } => {
      if details {
        for detail in client.fetch_pokemon_page_with_details(offset, limit).await? {
          println!(
            "{} {:<16} {}",
            detail.pokemon_number(),
            detail.formatted_name(),
            detail.primary_type()
          );
        }
      } else {
        let page = client.fetch_pokemon_list(offset, limit).await?;
        println!("{} Pokémon total", page.count);
        for entry in &page.results {
          match entry.id() {
            Some(id) => println!("#{:03} {}", id, entry.name),
            None => println!("     {}", entry.name),
          }
        }
      }
    }
    Command::Detail { target } => {
      let detail = match target.parse::<u32>() {
        Ok(id) => client.fetch_pokemon_detail(id).await?,
        Err(_) => client.fetch_pokemon_detail_by_url(&target).await?,
      };
      print_detail(&detail);
    }
    Command::Cache { action } => match action {
      CacheAction::Clear => {
        client.cache().clear();
        println!("Cache cleared");
      }
      CacheAction::Status { key, max_age_secs } => {
        let max_age = match max_age_secs {
          Some(secs) => chrono::Duration::try_seconds(secs)
            .ok_or_else(|| eyre!("max-age-secs out of range: {}", secs))?,
          None => default_max_age(&key),
        };
        let cache = client.cache();

        match cache.written_at(&key) {
          Some(at) => println!("{}: written {}", key, at.to_rfc3339()),
          None => println!("{}: not cached", key),
        }
        let state = if cache.is_cache_valid(&key, max_age) {
          "fresh"
        } else {
          "stale"
        };
        println!("{} (max age {}s)", state, max_age.num_seconds());
      }
    },
  }

  Ok(())
}
