use anyhow::Result;
use clap::{Parser, Subcommand};
use osmtrees::{ClientConfig, FeatureKind};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::fetch::FetchArgs;

/// Trees and tree stumps from OpenStreetMap
#[derive(Parser)]
#[command(name = "osmtrees")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Overpass interpreter endpoint
    #[arg(long, env = "OSMTREES_OVERPASS_URL", global = true)]
    overpass_url: Option<String>,

    /// Retries after an Overpass gateway timeout
    #[arg(long, env = "OSMTREES_MAX_RETRIES", global = true)]
    retries: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch trees (natural=tree) inside a bounding box
    Trees(FetchArgs),

    /// Fetch tree stumps (natural=tree_stump) inside a bounding box
    Stumps(FetchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout is reserved for records
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "osmtrees=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::default();
    if let Some(url) = cli.overpass_url {
        config.endpoint = url;
    }
    if let Some(retries) = cli.retries {
        config.retry = config.retry.with_max_retries(retries);
    }

    match cli.command {
        Commands::Trees(args) => commands::fetch::run(config, FeatureKind::Tree, args).await,
        Commands::Stumps(args) => commands::fetch::run(config, FeatureKind::Stump, args).await,
    }
}
