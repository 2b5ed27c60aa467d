//! mongostat daemon - MongoDB statistics exporter
//!
//! The daemon provides:
//! - Collection cycles over `collStats`, `$indexStats` and `serverStatus`
//! - A Prometheus `/metrics` endpoint
//! - A `/health` endpoint

use clap::Parser;
use mongostat_daemon::config::CollectMode;
use mongostat_daemon::error::{DaemonError, DaemonResult};
use mongostat_daemon::{DaemonConfig, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// mongostat CLI
///
/// Flags share their environment variables with the config loader
/// (`MONGOSTAT_<SECTION>__<KEY>`), so either path sets the same value.
#[derive(Parser)]
#[command(name = "mongostatd")]
#[command(
    about = "Export MongoDB collection, index and storage engine statistics to Prometheus",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MONGOSTAT_CONFIG")]
    config: Option<String>,

    /// MongoDB connection string
    #[arg(long, env = "MONGOSTAT_MONGODB__URI")]
    uri: Option<String>,

    /// Database holding the tracked collections
    #[arg(short, long, env = "MONGOSTAT_MONGODB__DATABASE")]
    database: Option<String>,

    /// Collection to report on (repeatable)
    #[arg(
        long = "collection",
        env = "MONGOSTAT_MONGODB__COLLECTIONS",
        value_delimiter = ','
    )]
    collections: Vec<String>,

    /// Listen address
    #[arg(short, long, env = "MONGOSTAT_SERVER__LISTEN_ADDR")]
    listen: Option<String>,

    /// Collect on every scrape instead of on an interval
    #[arg(long)]
    on_scrape: bool,

    /// Log level
    #[arg(long, env = "MONGOSTAT_LOGGING__LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "MONGOSTAT_LOGGING__JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())?;

    // Override with CLI args
    if let Some(uri) = cli.uri {
        config.mongodb.uri = uri;
    }
    if let Some(database) = cli.database {
        config.mongodb.database = database;
    }
    if !cli.collections.is_empty() {
        config.mongodb.collections = cli.collections;
    }
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if cli.on_scrape {
        config.collector.mode = CollectMode::OnScrape;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        "Starting mongostat"
    );

    let server = Server::new(config).await?;
    server.run().await
}
