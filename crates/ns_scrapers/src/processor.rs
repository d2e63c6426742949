use std::any::Any;
use std::panic::AssertUnwindSafe;

use chrono::Utc;
use futures::FutureExt;
use ns_core::{ArticleCatalog, ArticleRecord, ArticleStub, Result, RunLog, Source};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::category_resolver::CategoryResolver;
use crate::scrapers::{ArticleContent, ContentExtractor};

/// Counters and error messages accumulated over one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTally {
    pub found: u32,
    pub added: u32,
    pub updated: u32,
    pub errors: Vec<String>,
}

impl RunTally {
    pub fn record_error(&mut self, message: String) {
        error!("{}", message);
        self.errors.push(message);
    }

    /// Copies the tally into the log and stamps its finish time.
    pub fn finalize(&self, log: &mut RunLog, success: bool) {
        log.articles_found = self.found;
        log.articles_added = self.added;
        log.articles_updated = self.updated;
        log.errors = self.errors.join("\n");
        log.success = success;
        log.finished_at = Some(Utc::now());
    }
}

#[derive(Debug)]
pub enum ProcessOutcome {
    Added(ArticleRecord),
    Updated(ArticleRecord),
    Skipped,
}

/// Makes a stub URL absolute. Relative paths hang off the source base URL
/// as if it were a directory, so `/a` under `https://example.com/news`
/// becomes `https://example.com/news/a`.
pub fn resolve_article_url(base: &Url, raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Ok(raw.to_string());
    }
    if raw.starts_with("//") {
        return Ok(base.join(raw)?.to_string());
    }

    let mut directory = base.clone();
    if !directory.path().ends_with('/') {
        let path = format!("{}/", directory.path());
        directory.set_path(&path);
    }
    Ok(directory.join(raw.trim_start_matches('/'))?.to_string())
}

/// Reconciles stubs from one source into the catalog.
pub struct ArticleProcessor<'a> {
    source: &'a Source,
    base_url: Url,
    articles: &'a dyn ArticleCatalog,
    categories: &'a CategoryResolver,
    content: &'a dyn ContentExtractor,
}

impl<'a> ArticleProcessor<'a> {
    pub fn new(
        source: &'a Source,
        articles: &'a dyn ArticleCatalog,
        categories: &'a CategoryResolver,
        content: &'a dyn ContentExtractor,
    ) -> Result<Self> {
        Ok(Self {
            source,
            base_url: Url::parse(&source.base_url)?,
            articles,
            categories,
            content,
        })
    }

    /// Upserts one stub, links its categories and fills in the body when it
    /// is still missing. Content extraction failures are recorded in the
    /// tally and do not fail the stub.
    pub async fn process(&self, stub: &ArticleStub, tally: &mut RunTally) -> Result<ProcessOutcome> {
        let raw = stub.url.trim();
        if raw.is_empty() {
            warn!(title = %stub.title, "Skipping article without URL");
            return Ok(ProcessOutcome::Skipped);
        }
        let url = resolve_article_url(&self.base_url, raw)?;

        let existing = self.articles.get_by_url(&url).await?;
        let created = existing.is_none();
        let mut record = existing.unwrap_or_else(|| ArticleRecord::new(&url, self.source.id));

        record.title = stub.title.clone();
        record.summary = stub.summary.clone().unwrap_or_default();
        match stub.published_at {
            Some(published) => record.published_at = Some(published),
            None if created => record.published_at = Some(Utc::now()),
            None => {}
        }
        if let Some(image) = &stub.image_url {
            record.image_url = image.clone();
        }

        let mut record = if created {
            info!(title = %record.title, %url, "📰 New article");
            self.articles.create(&record).await?
        } else {
            debug!(title = %record.title, %url, "Updating article");
            self.articles.update(&record).await?
        };
        self.attach_categories(record.id, &stub.categories).await?;

        match &stub.content {
            Some(body) => {
                record.content = body.clone();
                record = self.articles.update(&record).await?;
            }
            None if created || record.content.trim().is_empty() => {
                let fetched = AssertUnwindSafe(self.content.fetch_content(&url)).catch_unwind().await;
                match fetched {
                    Ok(Ok(content)) => {
                        if let Err(e) = self.apply_content(&mut record, content).await {
                            tally.record_error(format!("error updating article with metadata for {}: {}", url, e));
                        }
                    }
                    Ok(Err(e)) => tally.record_error(format!("error scraping content for {}: {}", url, e)),
                    Err(panic) => tally.record_error(format!(
                        "error scraping content for {}: panicked: {}",
                        url,
                        panic_message(panic.as_ref())
                    )),
                }
            }
            None => debug!(%url, "Body already stored"),
        }

        if created {
            tally.added += 1;
            Ok(ProcessOutcome::Added(record))
        } else {
            tally.updated += 1;
            Ok(ProcessOutcome::Updated(record))
        }
    }

    async fn attach_categories(&self, article_id: i64, names: &[String]) -> Result<()> {
        for name in names {
            if let Some(category) = self.categories.resolve(name).await? {
                self.articles.associate_category(article_id, category.id).await?;
            }
        }
        Ok(())
    }

    /// Stores a non-empty body and merges page metadata. Missing metadata
    /// never clears what is already stored.
    async fn apply_content(&self, record: &mut ArticleRecord, content: ArticleContent) -> Result<()> {
        let ArticleContent { body, metadata } = content;
        if !body.trim().is_empty() {
            record.content = body;
        }
        if let Some(published) = metadata.published_at {
            record.published_at = Some(published);
        }
        if let Some(summary) = metadata.summary.filter(|s| !s.trim().is_empty()) {
            record.summary = summary;
        }

        *record = self.articles.update(record).await?;
        self.attach_categories(record.id, &metadata.categories).await
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use ns_core::{Error, Result};

    use crate::scrapers::{ArticleContent, ContentExtractor};

    pub enum Behaviour {
        Return(ArticleContent),
        Fail,
        Panic,
    }

    /// Content extractor with a canned response that counts its calls.
    pub struct MockContent {
        behaviour: Behaviour,
        pub calls: AtomicUsize,
    }

    impl MockContent {
        pub fn new(behaviour: Behaviour) -> Self {
            Self { behaviour, calls: AtomicUsize::new(0) }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentExtractor for MockContent {
        async fn fetch_content(&self, url: &str) -> Result<ArticleContent> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Return(content) => Ok(content.clone()),
                Behaviour::Fail => Err(Error::Fetch {
                    url: url.to_string(),
                    reason: "timed out".to_string(),
                }),
                Behaviour::Panic => panic!("extractor blew up on {}", url),
            }
        }
    }
}
