use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ns_scrapers::{handle_command, init_logging, HttpFetcher, ScrapeConfig, ScraperCommands, ScraperManager};
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(author, version, about = "Crawl news sites into a local article catalog", long_about = None)]
struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, default_value = "memory")]
    storage: String,
    /// Database file for the sqlite backend
    #[arg(long)]
    db: Option<PathBuf>,
    /// TOML file with crawl settings and sources
    #[arg(long)]
    config: Option<PathBuf>,
    /// Request timeout in seconds, overrides the config file
    #[arg(long)]
    timeout: Option<u64>,
    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: ScraperCommands,
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = ScrapeConfig::load_or_default(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
        config.validate()?;
    }
    debug!(sources = config.sources.len(), timeout_secs = config.timeout_secs, "Configuration ready");

    let catalog = ns_storage::create_catalog(&cli.storage, cli.db.as_deref())
        .await
        .with_context(|| format!("failed to open {} storage", cli.storage))?;
    let fetcher = Arc::new(HttpFetcher::from_config(&config)?);
    let manager = ScraperManager::new(catalog, fetcher);

    Ok(handle_command(cli.command, &manager, &config).await?)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
