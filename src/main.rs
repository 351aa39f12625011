//! Telechan main entry point
//!
//! Loads configuration, wires up the scrape service, and serves the
//! JSON API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use telechan::config::{load_config_with_hash, Config};
use telechan::scrape::ScrapeService;
use telechan::server::router;
use tracing_subscriber::EnvFilter;

/// Telechan: a Telegram public-channel scraping service
#[derive(Parser, Debug)]
#[command(name = "telechan")]
#[command(version = "1.0.0")]
#[command(about = "Scrapes public Telegram channel web views into JSON", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind address from the config, e.g. 127.0.0.1:9090
    #[arg(short, long)]
    bind: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) =
                load_config_with_hash(path).context("Failed to load configuration")?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No config file given, using defaults");
            Config::default()
        }
    };

    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    let bind = config.server.bind.clone();
    let service =
        Arc::new(ScrapeService::new(Arc::new(config)).context("Failed to build HTTP client")?);
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    tracing::info!("Listening on {}", bind);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("telechan=info,warn"),
            1 => EnvFilter::new("telechan=debug,info"),
            2 => EnvFilter::new("telechan=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
