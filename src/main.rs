use artist_locator::cache::Cache;
use artist_locator::clients::geocode::GeocoderCascade;
use artist_locator::clients::musicbrainz::MusicBrainzClient;
use artist_locator::clients::sparql::SparqlClient;
use artist_locator::clients::wikipedia::WikipediaClient;
use artist_locator::config::Config;
use artist_locator::logging;
use artist_locator::resolver::Resolver;
use artist_locator::server::{self, AppState};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "artist-locator")]
#[command(about = "Resolves the geographic origin of musical artists")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the streaming HTTP API
    Serve {
        /// Port to listen on, overriding config.toml
        #[arg(long)]
        port: Option<u16>,
    },
    /// Resolve a single artist name and print the result
    Resolve {
        /// Artist name to resolve
        name: String,
    },
}

fn build_resolver(config: &Config) -> Resolver {
    let musicbrainz = MusicBrainzClient::new(
        config.http.user_agent.clone(),
        config.http.max_retries,
        Duration::from_millis(config.pacing.musicbrainz_pace_ms),
    );
    let wikipedia = WikipediaClient::new(config.http.user_agent.clone(), config.http.max_retries);
    let sparql = SparqlClient::new(config.http.user_agent.clone(), config.http.max_retries);
    let geocoder = GeocoderCascade::new(config.http.user_agent.clone(), config.http.max_retries);

    Resolver {
        musicbrainz,
        wikipedia,
        sparql,
        geocoder,
    }
}

fn open_cache(config: &Config) -> Option<Cache> {
    match &config.cache.path {
        Some(path) => match Cache::open(path, config.cache.ttl_secs) {
            Ok(cache) => Some(cache),
            Err(e) => {
                error!(error = %e, path, "failed to open cache store, running cache-less");
                None
            }
        },
        None => None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Serve { port } => {
            let resolver = Arc::new(build_resolver(&config));
            let cache = open_cache(&config);
            let port = port.unwrap_or(config.server.port);

            let state = AppState {
                resolver,
                cache,
                pacing: config.pacing.clone(),
            };

            let router = server::build_router(state);
            server::serve(router, port).await?;
        }
        Commands::Resolve { name } => {
            let resolver = build_resolver(&config);
            let resolved = resolver.resolve(&name).await?;
            info!(artist = name.as_str(), ?resolved, "resolved");
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
    }

    Ok(())
}
