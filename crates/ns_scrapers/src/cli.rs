use clap::Subcommand;
use ns_core::{Result, RunLog};

use crate::config::ScrapeConfig;
use crate::manager::ScraperManager;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ScraperCommands {
    /// Scrape every active source, or just one
    Scrape {
        /// Slug of the source to scrape (e.g. guardian)
        #[arg(short, long)]
        source: Option<String>,
    },
    /// List configured sources
    Sources,
    /// List available scrapers
    Scrapers,
    /// Show the most recent run logs
    Logs {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

/// Runs one command. Returns `false` when a scrape failed or a requested
/// source could not be run.
pub async fn handle_command(command: ScraperCommands, manager: &ScraperManager, config: &ScrapeConfig) -> Result<bool> {
    match command {
        ScraperCommands::Scrape { source: Some(slug) } => match manager.run_source(&config.sources, &slug).await {
            Ok(log) => {
                println!("{}", describe_run(&slug, &log));
                Ok(log.success)
            }
            Err(e) => {
                eprintln!("❌ {}: {}", slug, e);
                Ok(false)
            }
        },
        ScraperCommands::Scrape { source: None } => {
            let mut all_ok = true;
            for (source, result) in manager.run_all(&config.sources).await {
                match result {
                    Ok(log) => {
                        all_ok &= log.success;
                        println!("{}", describe_run(&source.slug, &log));
                    }
                    Err(e) => {
                        all_ok = false;
                        eprintln!("❌ {}: {}", source.slug, e);
                    }
                }
            }
            Ok(all_ok)
        }
        ScraperCommands::Sources => {
            println!("Configured sources:");
            for source in &config.sources {
                let scraper = manager.registry().lookup(&source.slug).unwrap_or("-");
                let state = if source.active { "active" } else { "inactive" };
                println!(
                    "  {:<10} {:<24} {:<8} scraper={} {}",
                    source.slug, source.name, state, scraper, source.base_url
                );
            }
            Ok(true)
        }
        ScraperCommands::Scrapers => {
            println!("Available scrapers:");
            for identifier in manager.registry().identifiers() {
                println!("  {}", identifier);
            }
            Ok(true)
        }
        ScraperCommands::Logs { limit } => {
            let logs = manager.catalog().run_logs.recent_logs(limit).await?;
            if logs.is_empty() {
                println!("No runs recorded yet");
            }
            for log in &logs {
                let source = config
                    .sources
                    .iter()
                    .find(|s| s.id == log.source_id)
                    .map(|s| s.slug.as_str())
                    .unwrap_or("?");
                println!("{}", describe_run(source, log));
            }
            Ok(true)
        }
    }
}

fn describe_run(slug: &str, log: &RunLog) -> String {
    let emoji = if log.success { "✅" } else { "❌" };
    let mut line = format!(
        "{} {} #{} started {}: found {}, added {}, updated {}",
        emoji,
        slug,
        log.id,
        log.started_at.format("%Y-%m-%d %H:%M:%S"),
        log.articles_found,
        log.articles_added,
        log.articles_updated
    );
    let errors = log.errors.lines().count();
    if errors > 0 {
        line.push_str(&format!(", {} error(s)", errors));
    }
    line
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use clap::Parser;
    use ns_core::{Catalog, RunLogStore};
    use ns_storage::backends::memory::InMemoryStorage;

    use super::*;
    use crate::fetch::testing::StaticFetcher;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: ScraperCommands,
    }

    fn manager(storage: Arc<InMemoryStorage>) -> ScraperManager {
        ScraperManager::new(Catalog::from_backend(storage), Arc::new(StaticFetcher::new()))
    }

    #[test]
    fn test_parse_commands() {
        let cli = TestCli::parse_from(["ns", "scrape", "--source", "guardian"]);
        assert_eq!(cli.command, ScraperCommands::Scrape { source: Some("guardian".to_string()) });

        let cli = TestCli::parse_from(["ns", "logs"]);
        assert_eq!(cli.command, ScraperCommands::Logs { limit: 10 });
    }

    #[tokio::test]
    async fn test_unknown_source_fails() {
        let manager = manager(Arc::new(InMemoryStorage::new()));
        let config = ScrapeConfig::default();
        let command = ScraperCommands::Scrape { source: Some("bbc".to_string()) };
        assert!(!handle_command(command, &manager, &config).await.unwrap());
    }

    #[tokio::test]
    async fn test_scrape_with_unreachable_site_reports_failure() {
        let storage = Arc::new(InMemoryStorage::new());
        let manager = manager(storage.clone());
        let config = ScrapeConfig::default();

        let command = ScraperCommands::Scrape { source: Some("novinky".to_string()) };
        assert!(!handle_command(command, &manager, &config).await.unwrap());

        let logs = storage.recent_logs(10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].is_finished());
        assert!(handle_command(ScraperCommands::Logs { limit: 5 }, &manager, &config).await.unwrap());
    }

    #[test]
    fn test_describe_run() {
        let mut log = RunLog::start(1);
        log.id = 4;
        log.success = true;
        log.articles_found = 3;
        log.errors = "a\nb".to_string();
        let line = describe_run("guardian", &log);
        assert!(line.starts_with("✅ guardian #4"));
        assert!(line.ends_with("found 3, added 0, updated 0, 2 error(s)"));
    }
}
