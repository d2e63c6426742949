use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ns_core::{ArticleStub, Result, Source};
use scraper::{ElementRef, Html};
use tracing::{info, warn};
use url::Url;

use super::jsonld::{extract_linked_data, fill_metadata};
use super::utils::{
    attr, collect_isolated, dedup_stubs, extract_body, find_image, first_text, paragraph_fallback, push_unique,
    resolve_href, select_containers, select_first, selector, text_of, ImageRules, SelectorPolicy,
};
use super::{listing_pages, scan_pages, ArticleContent, ContentExtractor, ListingExtractor, PageMetadata};
use crate::fetch::Fetcher;
use crate::heuristics::categories::generic_category_from_url;
use crate::heuristics::dates::parse_ukrainian;

const CONTAINER_SELECTORS: &[&str] = &["div[data-vr-contentbox]"];
const IMAGE_RULES: ImageRules = ImageRules {
    selectors: &["picture img", "picture source"],
    attributes: &["src", "srcset"],
    background: false,
};
const BODY_CONTAINERS: &[&str] = &["div.post_text"];
const MIN_LINK_TEXT_CHARS: usize = 15;
const MIN_SUMMARY_CHARS: usize = 30;

/// pravda.com.ua: teaser blocks carry title and URL as `data-vr-contentbox*` attributes.
pub struct PravdaScraper {
    source: Source,
    fetcher: Arc<dyn Fetcher>,
}

impl PravdaScraper {
    pub fn new(source: Source, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { source, fetcher }
    }

    pub fn parse_listing(&self, html: &str, page: &Url) -> Result<Vec<ArticleStub>> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let containers = select_containers(root, CONTAINER_SELECTORS, SelectorPolicy::FirstMatch)?;
        let mut stubs = collect_isolated(containers, |element| self.stub_from_container(element, page));

        if stubs.is_empty() {
            warn!(page = %page, "No content boxes matched, scanning news links");
            let anchors = selector("a[href]")?;
            let links = root.select(&anchors).filter(|a| {
                attr(*a, "href").map_or(false, |href| href.contains("/news/") || href.contains("/articles/"))
            });
            stubs = collect_isolated(links, |link| self.stub_from_link(link, page));
        }

        Ok(dedup_stubs(stubs))
    }

    fn stub_from_container(&self, element: ElementRef<'_>, page: &Url) -> Result<Option<ArticleStub>> {
        let mut title = attr(element, "data-vr-contentbox").unwrap_or_default().to_string();
        let mut href = attr(element, "data-vr-contentbox-url");

        if href.is_none() {
            if let Some(link) = select_first(element, &["a[href]"])? {
                href = attr(link, "href");
                if title.is_empty() {
                    title = text_of(link);
                }
            }
        }

        let Some(href) = href else {
            return Ok(None);
        };
        if title.is_empty() {
            return Ok(None);
        }

        self.build_stub(element, resolve_href(page, href)?, title, page).map(Some)
    }

    fn stub_from_link(&self, link: ElementRef<'_>, page: &Url) -> Result<Option<ArticleStub>> {
        let title = text_of(link);
        if title.chars().count() < MIN_LINK_TEXT_CHARS {
            return Ok(None);
        }
        let Some(href) = attr(link, "href") else {
            return Ok(None);
        };
        let scope = link.parent().and_then(ElementRef::wrap).unwrap_or(link);
        self.build_stub(scope, resolve_href(page, href)?, title, page).map(Some)
    }

    /// Listing teasers carry no summary, date or section; those come from the article page.
    fn build_stub(&self, scope: ElementRef<'_>, url: String, title: String, page: &Url) -> Result<ArticleStub> {
        let mut stub = ArticleStub::new(url, title);
        let image = match find_image(scope, &IMAGE_RULES)? {
            Some(src) => resolve_href(page, &src)?,
            None => String::new(),
        };
        stub.image_url = Some(image);
        Ok(stub)
    }

    pub fn parse_article(&self, html: &str, url: &str) -> Result<ArticleContent> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let mut paragraphs = extract_body(root, BODY_CONTAINERS, 1)?;
        if paragraphs.is_empty() {
            paragraphs = paragraph_fallback(root)?;
        }

        let mut metadata = PageMetadata {
            published_at: first_text(root, &["div.post_time"])?.and_then(|t| parse_ukrainian(&t)),
            summary: root
                .select(&selector("div.post_text p")?)
                .map(text_of)
                .find(|text| text.chars().count() > MIN_SUMMARY_CHARS),
            categories: Vec::new(),
        };
        for tag in root.select(&selector("div.post_tags a")?) {
            push_unique(&mut metadata.categories, text_of(tag));
        }

        fill_metadata(&mut metadata, extract_linked_data(root));
        if metadata.categories.is_empty() {
            metadata.categories.extend(generic_category_from_url(url));
        }

        Ok(ArticleContent {
            body: paragraphs.join("\n\n"),
            metadata,
        })
    }
}

#[async_trait]
impl ListingExtractor for PravdaScraper {
    fn name(&self) -> &str {
        "pravda"
    }

    async fn list_articles(&self, _now: DateTime<Utc>) -> Result<Vec<ArticleStub>> {
        let pages = listing_pages(&self.source, &[])?;
        let stubs = scan_pages(self.fetcher.as_ref(), &pages, |html, page| self.parse_listing(html, page)).await?;
        info!(source = %self.source.slug, count = stubs.len(), "Total articles found");
        Ok(stubs)
    }
}

#[async_trait]
impl ContentExtractor for PravdaScraper {
    async fn fetch_content(&self, url: &str) -> Result<ArticleContent> {
        let html = self.fetcher.fetch(url).await?;
        let content = self.parse_article(&html, url)?;
        info!(%url, chars = content.body.len(), "📄 Extracted article content");
        Ok(content)
    }
}
