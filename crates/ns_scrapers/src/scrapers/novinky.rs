use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ns_core::{ArticleStub, Result, Source};
use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};
use url::Url;

use super::jsonld::{extract_linked_data, fill_metadata};
use super::utils::{
    attr, collect_isolated, dedup_stubs, extract_body, find_image, first_text, meta_content, paragraph_fallback,
    push_unique, resolve_href, select_containers, select_first, selector, text_of, ImageRules, SelectorPolicy,
};
use super::{listing_pages, scan_pages, ArticleContent, ContentExtractor, ListingExtractor, PageMetadata};
use crate::fetch::Fetcher;
use crate::heuristics::categories::{novinky_category_from_url, CategoryTable, NOVINKY_CATEGORIES};
use crate::heuristics::dates::{parse_timestamp_attr, resolve_date_text, RelativeVocabulary, CZECH};

const CONTAINER_SELECTORS: &[&str] = &["article.q_h7", "article", "div.article, div.list-art", ".article-tile"];
const LINK_SELECTORS: &[&str] = &["h3 a", "h2 a", "h4 a", "a.title", ".title a", "a[href*=\"/clanek/\"]", "a"];
const SUMMARY_SELECTORS: &[&str] = &["div.g_iT", "p.q_il", "div.perex", "p.perex", ".article-perex", ".summary"];
const TIME_SELECTORS: &[&str] = &["time", ".time", ".date", "span.date", "[datetime]"];
const IMAGE_RULES: ImageRules = ImageRules {
    selectors: &["img", "picture img", ".thumbnail img", ".image img"],
    attributes: &["src", "data-src", "data-srcset", "srcset"],
    background: true,
};

const BODY_CONTAINERS: &[&str] = &[
    "div.e_es.e_eD",
    "div.article-content",
    ".article-body",
    "article",
    ".article-detail-content",
];
const PUBLISHED_META: &[&str] = &["meta[property=\"article:published_time\"]", "meta[itemprop=\"datePublished\"]"];
const SUMMARY_META: &[&str] = &["meta[property=\"og:description\"]", "meta[name=\"description\"]"];
const SECTION_META: &[&str] = &["meta[property=\"article:section\"]"];

/// Body paragraphs this short are navigation crumbs, not text.
const MIN_PARAGRAPH_CHARS: usize = 6;
const MIN_LINK_TEXT_CHARS: usize = 10;

/// novinky.cz: first container selector with matches wins.
pub struct NovinkyScraper {
    source: Source,
    fetcher: Arc<dyn Fetcher>,
    categories: CategoryTable,
    vocabulary: RelativeVocabulary,
}

impl NovinkyScraper {
    pub fn new(source: Source, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            source,
            fetcher,
            categories: NOVINKY_CATEGORIES,
            vocabulary: CZECH,
        }
    }

    pub fn with_categories(mut self, categories: CategoryTable) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: RelativeVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn parse_listing(&self, html: &str, page: &Url, now: DateTime<Utc>) -> Result<Vec<ArticleStub>> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let containers = select_containers(root, CONTAINER_SELECTORS, SelectorPolicy::FirstMatch)?;
        let mut stubs = collect_isolated(containers, |element| self.stub_from_container(element, page, now));

        if stubs.is_empty() {
            warn!(page = %page, "No article containers matched, scanning article links");
            let anchors = selector("a[href]")?;
            let links = root
                .select(&anchors)
                .filter(|a| attr(*a, "href").map_or(false, |href| href.contains("/clanek/")));
            stubs = collect_isolated(links, |link| self.stub_from_link(link, page, now));
        }

        Ok(dedup_stubs(stubs))
    }

    fn stub_from_container(&self, element: ElementRef<'_>, page: &Url, now: DateTime<Utc>) -> Result<Option<ArticleStub>> {
        let Some(link) = select_first(element, LINK_SELECTORS)? else {
            debug!("No link element found in article container");
            return Ok(None);
        };
        let Some(href) = attr(link, "href") else {
            return Ok(None);
        };
        let title = text_of(link);
        if title.is_empty() {
            return Ok(None);
        }

        let url = resolve_href(page, href)?;
        self.describe(element, url, title, page, now).map(Some)
    }

    fn stub_from_link(&self, link: ElementRef<'_>, page: &Url, now: DateTime<Utc>) -> Result<Option<ArticleStub>> {
        let title = text_of(link);
        if title.chars().count() < MIN_LINK_TEXT_CHARS {
            return Ok(None);
        }
        let Some(href) = attr(link, "href") else {
            return Ok(None);
        };

        let url = resolve_href(page, href)?;
        let scope = link.parent().and_then(ElementRef::wrap).unwrap_or(link);
        self.describe(scope, url, title, page, now).map(Some)
    }

    fn describe(
        &self,
        scope: ElementRef<'_>,
        url: String,
        title: String,
        page: &Url,
        now: DateTime<Utc>,
    ) -> Result<ArticleStub> {
        let mut stub = ArticleStub::new(url, title);

        let summary = first_text(scope, SUMMARY_SELECTORS)?.map(|s| strip_date_prefix(&s));
        stub.summary = Some(summary.unwrap_or_default());
        stub.published_at = self.published_at(scope, now)?;

        let image = match find_image(scope, &IMAGE_RULES)? {
            Some(src) => resolve_href(page, &src)?,
            None => String::new(),
        };
        stub.image_url = Some(image);
        stub.categories = novinky_category_from_url(&stub.url, self.categories).into_iter().collect();

        debug!(title = %stub.title, url = %stub.url, "Extracted listing entry");
        Ok(stub)
    }

    fn published_at(&self, scope: ElementRef<'_>, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        for css in TIME_SELECTORS {
            let Some(element) = scope.select(&selector(css)?).next() else {
                continue;
            };
            let parsed = match attr(element, "datetime") {
                Some(value) => parse_timestamp_attr(value),
                None => resolve_date_text(&text_of(element), &self.vocabulary, now),
            };
            if parsed.is_some() {
                return Ok(parsed);
            }
        }
        Ok(None)
    }

    pub fn parse_article(&self, html: &str, url: &str) -> Result<ArticleContent> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let mut paragraphs = extract_body(root, BODY_CONTAINERS, MIN_PARAGRAPH_CHARS)?;
        if paragraphs.is_empty() {
            paragraphs = paragraph_fallback(root)?;
        }

        let mut metadata = PageMetadata {
            published_at: meta_content(root, PUBLISHED_META)?
                .as_deref()
                .and_then(parse_timestamp_attr),
            summary: meta_content(root, SUMMARY_META)?
                .or(first_text(root, &["div.perex", "p.perex", ".article-perex"])?),
            categories: Vec::new(),
        };
        if metadata.published_at.is_none() {
            metadata.published_at = select_first(root, &["time[datetime]"])?
                .and_then(|t| attr(t, "datetime"))
                .and_then(parse_timestamp_attr);
        }
        if let Some(section) = meta_content(root, SECTION_META)? {
            push_unique(&mut metadata.categories, section);
        }

        fill_metadata(&mut metadata, extract_linked_data(root));
        if metadata.categories.is_empty() {
            metadata.categories.extend(novinky_category_from_url(url, self.categories));
        }

        Ok(ArticleContent {
            body: paragraphs.join("\n\n"),
            metadata,
        })
    }
}

/// Listing perexes start with "<time> · ".
fn strip_date_prefix(summary: &str) -> String {
    match summary.split_once('·') {
        Some((_, rest)) => rest.trim().to_string(),
        None => summary.to_string(),
    }
}

#[async_trait]
impl ListingExtractor for NovinkyScraper {
    fn name(&self) -> &str {
        "novinky"
    }

    async fn list_articles(&self, now: DateTime<Utc>) -> Result<Vec<ArticleStub>> {
        let pages = listing_pages(&self.source, &[])?;
        let stubs = scan_pages(self.fetcher.as_ref(), &pages, |html, page| self.parse_listing(html, page, now)).await?;
        info!(source = %self.source.slug, count = stubs.len(), "Total articles found");
        Ok(stubs)
    }
}

#[async_trait]
impl ContentExtractor for NovinkyScraper {
    async fn fetch_content(&self, url: &str) -> Result<ArticleContent> {
        let html = self.fetcher.fetch(url).await?;
        let content = self.parse_article(&html, url)?;
        info!(%url, chars = content.body.len(), "📄 Extracted article content");
        Ok(content)
    }
}
