use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ns_core::{ArticleStub, Result, Source};
use tracing::{info, warn};
use url::Url;

use crate::fetch::Fetcher;

pub mod guardian;
pub mod jsonld;
pub mod novinky;
pub mod pravda;
pub(crate) mod utils;

pub use guardian::GuardianScraper;
pub use novinky::NovinkyScraper;
pub use pravda::PravdaScraper;

/// Metadata found on an article page. Empty fields mean "not found".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub published_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleContent {
    /// Plain text, paragraphs separated by a blank line. Empty when nothing was found.
    pub body: String,
    pub metadata: PageMetadata,
}

#[async_trait]
pub trait ListingExtractor: Send + Sync {
    /// Registry identifier of the layout this extractor understands
    fn name(&self) -> &str;

    /// Scans the source's listing page(s) and returns deduplicated stubs.
    /// `now` anchors relative dates such as "today 9:53".
    async fn list_articles(&self, now: DateTime<Utc>) -> Result<Vec<ArticleStub>>;
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Fetches one article page and extracts its body and metadata
    async fn fetch_content(&self, url: &str) -> Result<ArticleContent>;
}

/// Listing and content extractors bound to one source.
#[derive(Clone)]
pub struct ScraperPair {
    pub listing: Arc<dyn ListingExtractor>,
    pub content: Arc<dyn ContentExtractor>,
}

impl ScraperPair {
    pub fn from_scraper<S>(scraper: S) -> Self
    where
        S: ListingExtractor + ContentExtractor + 'static,
    {
        let scraper = Arc::new(scraper);
        Self {
            listing: scraper.clone(),
            content: scraper,
        }
    }
}

/// Base URL followed by one page per configured section. Sections already
/// part of the base URL are skipped.
pub(crate) fn listing_pages(source: &Source, default_sections: &[&str]) -> Result<Vec<Url>> {
    let base = Url::parse(&source.base_url)?;
    let sections: Vec<&str> = if source.sections.is_empty() {
        default_sections.to_vec()
    } else {
        source.sections.iter().map(String::as_str).collect()
    };

    let mut pages = vec![base.clone()];
    for section in sections {
        let section = section.trim_matches('/');
        if section.is_empty() || source.base_url.contains(section) {
            continue;
        }
        let page = base.join(&format!("/{}", section))?;
        if !pages.contains(&page) {
            pages.push(page);
        }
    }
    Ok(pages)
}

/// Fetches and parses every listing page. A page that fails is logged and
/// skipped; the listing only fails when no page succeeds.
pub(crate) async fn scan_pages<F>(fetcher: &dyn Fetcher, pages: &[Url], parse: F) -> Result<Vec<ArticleStub>>
where
    F: Fn(&str, &Url) -> Result<Vec<ArticleStub>> + Send + Sync,
{
    let mut stubs = Vec::new();
    let mut last_error = None;
    let mut scanned = 0;

    for page in pages {
        let result = match fetcher.fetch(page.as_str()).await {
            Ok(html) => parse(&html, page),
            Err(e) => Err(e),
        };
        match result {
            Ok(found) => {
                info!(page = %page, count = found.len(), "📰 Listing page scanned");
                stubs.extend(found);
                scanned += 1;
            }
            Err(e) => {
                warn!(page = %page, error = %e, "Skipping listing page");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if scanned == 0 => Err(e),
        _ => Ok(utils::dedup_stubs(stubs)),
    }
}
