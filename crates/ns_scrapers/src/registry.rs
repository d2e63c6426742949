use std::sync::Arc;

use ns_core::{Error, Result, Source};
use tracing::debug;

use crate::fetch::Fetcher;
use crate::scrapers::{GuardianScraper, NovinkyScraper, PravdaScraper, ScraperPair};

/// Builds the extractor pair for a source.
pub type ScraperFactory = Box<dyn Fn(&Source, Arc<dyn Fetcher>) -> ScraperPair + Send + Sync>;

/// Maps source identifiers to scraper factories.
///
/// Lookup is exact first, then the first registered identifier contained in
/// the requested one. Registration order decides between several partial
/// matches.
pub struct ScraperRegistry {
    entries: Vec<(String, ScraperFactory)>,
}

impl ScraperRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Registry with the built-in `novinky`, `pravda` and `guardian` scrapers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("novinky", |source, fetcher| {
            ScraperPair::from_scraper(NovinkyScraper::new(source.clone(), fetcher))
        });
        registry.register("pravda", |source, fetcher| {
            ScraperPair::from_scraper(PravdaScraper::new(source.clone(), fetcher))
        });
        registry.register("guardian", |source, fetcher| {
            ScraperPair::from_scraper(GuardianScraper::new(source.clone(), fetcher))
        });
        registry
    }

    /// Adds a factory. Re-registering an identifier replaces the factory in place.
    pub fn register<F>(&mut self, identifier: &str, factory: F)
    where
        F: Fn(&Source, Arc<dyn Fetcher>) -> ScraperPair + Send + Sync + 'static,
    {
        let identifier = identifier.to_lowercase();
        match self.entries.iter_mut().find(|(id, _)| *id == identifier) {
            Some(entry) => entry.1 = Box::new(factory),
            None => self.entries.push((identifier, Box::new(factory))),
        }
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.entries.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Registered identifier that serves `identifier`.
    pub fn lookup(&self, identifier: &str) -> Result<&str> {
        let wanted = identifier.to_lowercase();
        self.entries
            .iter()
            .find(|(id, _)| *id == wanted)
            .or_else(|| self.entries.iter().find(|(id, _)| wanted.contains(id.as_str())))
            .map(|(id, _)| id.as_str())
            .ok_or_else(|| Error::UnsupportedSource(identifier.to_string()))
    }

    /// Extractors for `source`, looked up by its slug.
    pub fn resolve(&self, source: &Source, fetcher: Arc<dyn Fetcher>) -> Result<ScraperPair> {
        let identifier = self.lookup(&source.slug)?;
        debug!(slug = %source.slug, scraper = identifier, "Resolved scraper");
        let (_, factory) = self
            .entries
            .iter()
            .find(|(id, _)| id == identifier)
            .ok_or_else(|| Error::UnsupportedSource(source.slug.clone()))?;
        Ok(factory(source, fetcher))
    }
}

impl Default for ScraperRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
