//! # HubSync Worker Entry Point
//!
//! Loads configuration, wires up the HubSpot client and sink, and runs one
//! sync pass over every configured account.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info};

use hubsync::config::ConfigLoader;
use hubsync::hubspot::HubSpotClient;
use hubsync::logging;
use hubsync::sink::LoggingSink;
use hubsync::store::InMemoryAccountStore;
use hubsync::sync::SyncEngine;

#[derive(Debug, Parser)]
#[command(name = "hubsync", about = "Incremental HubSpot to analytics sync worker")]
struct Cli {
    /// Directory containing layered .env files (defaults to the working
    /// directory).
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loader = match cli.config_dir {
        Some(dir) => ConfigLoader::with_base_dir(dir),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;

    logging::init_subscriber(&config);
    info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        debug!(config = %redacted_json, "Effective configuration");
    }

    let config = Arc::new(config);
    let client = HubSpotClient::new(&config);
    let sink = Arc::new(LoggingSink);
    let store = InMemoryAccountStore::from_env();

    let engine = SyncEngine::new(Arc::clone(&config), client, sink);
    engine.run(&store).await?;

    Ok(())
}
