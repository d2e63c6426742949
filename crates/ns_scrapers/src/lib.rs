pub mod category_resolver;
pub mod clean;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod heuristics;
pub mod logging;
pub mod manager;
pub mod processor;
pub mod registry;
pub mod scrapers;

pub use category_resolver::CategoryResolver;
pub use clean::clean;
pub use cli::{handle_command, ScraperCommands};
pub use config::{default_sources, ScrapeConfig};
pub use fetch::{Fetcher, HttpFetcher};
pub use logging::{init_logging, Logger};
pub use manager::ScraperManager;
pub use processor::{resolve_article_url, ArticleProcessor, ProcessOutcome, RunTally};
pub use registry::{ScraperFactory, ScraperRegistry};
pub use scrapers::{ArticleContent, ContentExtractor, ListingExtractor, PageMetadata, ScraperPair};

pub mod prelude {
    pub use super::scrapers::{ContentExtractor, ListingExtractor};
    pub use ns_core::{ArticleStub, Error, Result, Source};
}
