use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use ns_core::{Catalog, Error, Result, RunLog, Source};
use tracing::{error, info};

use crate::category_resolver::CategoryResolver;
use crate::fetch::Fetcher;
use crate::logging::Logger;
use crate::processor::{panic_message, ArticleProcessor, RunTally};
use crate::registry::ScraperRegistry;
use crate::scrapers::ScraperPair;

pub struct ScraperManager {
    catalog: Catalog,
    registry: ScraperRegistry,
    fetcher: Arc<dyn Fetcher>,
    categories: CategoryResolver,
}

impl ScraperManager {
    pub fn new(catalog: Catalog, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_registry(catalog, fetcher, ScraperRegistry::with_defaults())
    }

    pub fn with_registry(catalog: Catalog, fetcher: Arc<dyn Fetcher>, registry: ScraperRegistry) -> Self {
        let categories = CategoryResolver::new(catalog.categories.clone());
        Self {
            catalog,
            registry,
            fetcher,
            categories,
        }
    }

    pub fn registry(&self) -> &ScraperRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Scrapes one source and returns its finalized run log.
    ///
    /// Listing failures, per-article failures and panics end up in the log's
    /// `errors`, never in the return value. Only an unsupported source or a
    /// failure to create the log is returned as `Err`.
    pub async fn run_scrape(&self, source: &Source) -> Result<RunLog> {
        let pair = self.registry.resolve(source, self.fetcher.clone())?;
        let logger = Logger::new().with_prefix(format!("[{}]", source.slug));

        let mut log = self.catalog.run_logs.create_log(&RunLog::start(source.id)).await?;
        logger.info(&format!("🚀 Starting scrape of {}", source.name));

        let mut tally = RunTally::default();
        let outcome = AssertUnwindSafe(self.scrape_into(source, &pair, log.started_at, &mut tally, &logger))
            .catch_unwind()
            .await;

        let success = match outcome {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tally.record_error(format!("error during scraping of {}: {}", source.name, e));
                false
            }
            Err(panic) => {
                tally.record_error(format!(
                    "error during scraping of {}: panicked: {}",
                    source.name,
                    panic_message(panic.as_ref())
                ));
                false
            }
        };

        tally.finalize(&mut log, success);
        if let Err(e) = self.catalog.run_logs.update_log_by_id(&log).await {
            logger.error(&format!("Failed to persist run log {}: {}", log.id, e));
        }

        logger.info(&format!(
            "✅ Finished: found {}, added {}, updated {}, {} error(s)",
            log.articles_found,
            log.articles_added,
            log.articles_updated,
            tally.errors.len()
        ));
        Ok(log)
    }

    async fn scrape_into(
        &self,
        source: &Source,
        pair: &ScraperPair,
        now: DateTime<Utc>,
        tally: &mut RunTally,
        logger: &Logger,
    ) -> Result<()> {
        let stubs = pair.listing.list_articles(now).await?;
        tally.found = u32::try_from(stubs.len()).unwrap_or(u32::MAX);
        logger.info(&format!("🔍 Found {} articles", stubs.len()));

        let processor = ArticleProcessor::new(
            source,
            self.catalog.articles.as_ref(),
            &self.categories,
            pair.content.as_ref(),
        )?;

        for (i, stub) in stubs.iter().enumerate() {
            logger.debug(&format!("Processing {}/{}: {}", i + 1, stubs.len(), stub.url));
            let result = AssertUnwindSafe(processor.process(stub, tally)).catch_unwind().await;
            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tally.record_error(format!("error processing {}: {}", stub.url, e)),
                Err(panic) => tally.record_error(format!(
                    "error processing {}: panicked: {}",
                    stub.url,
                    panic_message(panic.as_ref())
                )),
            }
        }
        Ok(())
    }

    /// Runs every active source in order, one result per source.
    pub async fn run_all(&self, sources: &[Source]) -> Vec<(Source, Result<RunLog>)> {
        let mut results = Vec::new();
        for source in sources.iter().filter(|s| s.active) {
            let result = self.run_scrape(source).await;
            if let Err(e) = &result {
                error!(source = %source.slug, error = %e, "Scrape could not run");
            }
            results.push((source.clone(), result));
        }
        info!(sources = results.len(), "🏁 All sources processed");
        results
    }

    /// Runs the active source with the given slug.
    pub async fn run_source(&self, sources: &[Source], slug: &str) -> Result<RunLog> {
        let source = sources
            .iter()
            .find(|s| s.slug == slug && s.active)
            .ok_or_else(|| Error::Config(format!("No active source with slug '{}'", slug)))?;
        self.run_scrape(source).await
    }
}
