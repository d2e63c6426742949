use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ns_core::{ArticleStub, Result, Source};
use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};
use url::Url;

use super::jsonld::{extract_linked_data, fill_metadata};
use super::utils::{
    attr, collect_isolated, dedup_stubs, extract_body, find_image, find_image_near, find_summary_near, first_text,
    meta_content, paragraph_fallback, push_unique, resolve_href, same_site, select_containers, select_first,
    selector, text_of, ImageRules, SelectorPolicy,
};
use super::{listing_pages, scan_pages, ArticleContent, ContentExtractor, ListingExtractor, PageMetadata};
use crate::fetch::Fetcher;
use crate::heuristics::categories::{guardian_category_from_url, CategoryTable, GUARDIAN_SECTIONS};
use crate::heuristics::dates::{parse_fuzzy, parse_timestamp_attr};

pub const DEFAULT_SECTIONS: &[&str] = &["europe"];
const DEFAULT_CATEGORY: &str = "News";

/// Front pages mix several card layouts, so every selector contributes.
const CONTAINER_SELECTORS: &[&str] = &[
    "div.fc-item--standard",
    "div.fc-item",
    "div.js-snappa-item",
    "div[data-link-name*=\"article\"]",
    "article",
    "a.u-faux-block-link__overlay",
];
const LINK_SELECTORS: &[&str] = &[
    "a.fc-item__link",
    "a.u-faux-block-link__overlay",
    "h3 a",
    "h2 a",
    "a[data-link-name*=\"article\"]",
    "a",
];
const HEADING_SELECTORS: &[&str] = &["h1, h2, h3, h4, .fc-item__title, .js-headline-text"];
const CARD_SUMMARY: &[&str] = &[".fc-item__standfirst, p"];
const KICKER_SELECTORS: &[&str] = &[".fc-item__kicker"];
const IMAGE_RULES: ImageRules = ImageRules {
    selectors: &[
        "picture img",
        "img[src]",
        "div[data-component=\"image\"] img, div[data-gu-name=\"image\"] img",
    ],
    attributes: &["src"],
    background: false,
};
/// Section paths that identify article links when no card matched.
const LINK_SECTIONS: &[&str] = &["europe", "technology", "business", "world", "uk-news"];
const MIN_TITLE_CHARS: usize = 10;
const MIN_SUMMARY_CHARS: usize = 20;
const ANCESTOR_LEVELS: usize = 3;

const HEADLINE_SELECTORS: &[&str] = &[
    "h1.dcr-y70mar, h1.dcr-u0152o, h1.dcr-65q7o2",
    "h1[data-component=\"headline\"]",
    "h1.content__headline",
    "h1",
];
const BODY_CONTAINERS: &[&str] = &[
    "div.dcr-1f6fo0p, div.dcr-hzam7a, div.dcr-1fnjjtg",
    "div[data-component=\"body\"]",
    "div.content__article-body",
    "article[itemprop=\"articleBody\"]",
    "div.article-body-commercial-selector",
    "div.js-article__body",
];
const DATE_SELECTORS: &[&str] = &[
    "time[datetime]",
    "time[data-timestamp]",
    ".content__dateline time",
    "[itemprop=\"datePublished\"]",
    ".dcr-u003f1",
];
const STANDFIRST_SELECTORS: &[&str] = &["div[data-component=\"standfirst\"]", ".content__standfirst"];
const CATEGORY_SELECTORS: &[&str] = &[
    "a[data-link-name=\"article section\"]",
    ".content__section-label a",
    "ul.dcr-12ctpfx li a",
];

/// theguardian.com: base page plus configured sections, cards accumulated
/// from every container selector.
pub struct GuardianScraper {
    source: Source,
    fetcher: Arc<dyn Fetcher>,
    sections: CategoryTable,
}

impl GuardianScraper {
    pub fn new(source: Source, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            source,
            fetcher,
            sections: GUARDIAN_SECTIONS,
        }
    }

    pub fn with_sections(mut self, sections: CategoryTable) -> Self {
        self.sections = sections;
        self
    }

    fn category_for(&self, url: &str) -> Option<String> {
        guardian_category_from_url(url, self.sections)
    }

    pub fn parse_listing(&self, html: &str, page: &Url) -> Result<Vec<ArticleStub>> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let elements = select_containers(root, CONTAINER_SELECTORS, SelectorPolicy::Accumulate)?;
        let mut stubs = collect_isolated(elements, |element| {
            if element.value().name() == "a" {
                self.stub_from_link(element, page)
            } else {
                self.stub_from_card(element, page)
            }
        });

        if stubs.is_empty() {
            warn!(page = %page, "No article cards matched, scanning article links");
            let anchors = selector("a[href]")?;
            let links = root
                .select(&anchors)
                .filter(|a| attr(*a, "href").map_or(false, is_article_href));
            stubs = collect_isolated(links, |link| self.stub_from_link(link, page));
        }

        Ok(dedup_stubs(stubs))
    }

    fn stub_from_link(&self, link: ElementRef<'_>, page: &Url) -> Result<Option<ArticleStub>> {
        let Some(href) = attr(link, "href") else {
            return Ok(None);
        };
        let url = resolve_href(page, href)?;
        if !same_site(&url, page) {
            return Ok(None);
        }

        let title = text_of(link);
        if title.chars().count() < MIN_TITLE_CHARS {
            return Ok(None);
        }
        debug!(%title, %url, "Processing link");

        let mut stub = ArticleStub::new(url, title);
        let image = match find_image_near(link, &IMAGE_RULES, ANCESTOR_LEVELS)? {
            Some(src) => resolve_href(page, &src)?,
            None => String::new(),
        };
        stub.image_url = Some(image);
        let summary = find_summary_near(link, "p.fc-item__standfirst, p", &stub.title, MIN_SUMMARY_CHARS, ANCESTOR_LEVELS)?;
        stub.summary = Some(summary.unwrap_or_default());
        stub.categories = vec![self.category_for(&stub.url).unwrap_or_else(|| DEFAULT_CATEGORY.to_string())];
        Ok(Some(stub))
    }

    fn stub_from_card(&self, card: ElementRef<'_>, page: &Url) -> Result<Option<ArticleStub>> {
        let Some(link) = select_first(card, LINK_SELECTORS)? else {
            debug!("No link element found in card");
            return Ok(None);
        };
        let Some(href) = attr(link, "href") else {
            return Ok(None);
        };
        let url = resolve_href(page, href)?;

        let mut title = text_of(link);
        if title.is_empty() {
            title = first_text(card, HEADING_SELECTORS)?.unwrap_or_default();
        }
        if title.is_empty() {
            warn!(%url, "No title found");
            return Ok(None);
        }

        let summary = first_text(card, CARD_SUMMARY)?.filter(|s| *s != title);
        let image = match find_image(card, &IMAGE_RULES)? {
            Some(src) => resolve_href(page, &src)?,
            None => String::new(),
        };

        let category = match self.category_for(&url) {
            Some(category) => Some(category),
            None => first_text(card, KICKER_SELECTORS)?.filter(|k| *k != title),
        };

        let mut stub = ArticleStub::new(url, title);
        stub.summary = Some(summary.unwrap_or_default());
        stub.image_url = Some(image);
        stub.categories = vec![category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string())];
        Ok(Some(stub))
    }

    pub fn parse_article(&self, html: &str, url: &str) -> Result<ArticleContent> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let mut paragraphs: Vec<String> = first_text(root, HEADLINE_SELECTORS)?.into_iter().collect();
        let mut body = extract_body(root, BODY_CONTAINERS, 1)?;
        if body.is_empty() {
            body = paragraph_fallback(root)?;
        }
        paragraphs.extend(body);

        let mut metadata = PageMetadata {
            published_at: published_at(root)?,
            summary: first_text(root, STANDFIRST_SELECTORS)?.or(meta_content(root, &["meta[name=\"description\"]"])?),
            categories: Vec::new(),
        };

        for css in CATEGORY_SELECTORS {
            for element in root.select(&selector(css)?) {
                push_unique(&mut metadata.categories, text_of(element));
            }
        }
        if let Some(section) = meta_content(root, &["meta[property=\"article:section\"]"])? {
            push_unique(&mut metadata.categories, section);
        }

        fill_metadata(&mut metadata, extract_linked_data(root));
        if metadata.categories.is_empty() {
            let category = self.category_for(url).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
            metadata.categories.push(category);
        }

        Ok(ArticleContent {
            body: paragraphs.join("\n\n"),
            metadata,
        })
    }
}

fn is_article_href(href: &str) -> bool {
    let looks_like_article =
        href.contains("/article/") || LINK_SECTIONS.iter().any(|s| href.contains(&format!("/{}/", s)));
    looks_like_article && !href.ends_with("/all") && !href.contains("live")
}

/// Machine-readable attributes first, then the element text.
fn published_at(root: ElementRef<'_>) -> Result<Option<DateTime<Utc>>> {
    for css in DATE_SELECTORS {
        let Some(element) = root.select(&selector(css)?).next() else {
            continue;
        };
        let from_attr = ["datetime", "data-timestamp"]
            .iter()
            .filter_map(|name| attr(element, name))
            .find_map(parse_timestamp_attr);
        if let Some(published) = from_attr.or_else(|| parse_fuzzy(&text_of(element))) {
            return Ok(Some(published));
        }
    }
    Ok(None)
}

#[async_trait]
impl ListingExtractor for GuardianScraper {
    fn name(&self) -> &str {
        "guardian"
    }

    async fn list_articles(&self, _now: DateTime<Utc>) -> Result<Vec<ArticleStub>> {
        let pages = listing_pages(&self.source, DEFAULT_SECTIONS)?;
        let stubs = scan_pages(self.fetcher.as_ref(), &pages, |html, page| self.parse_listing(html, page)).await?;
        info!(source = %self.source.slug, pages = pages.len(), count = stubs.len(), "Total articles found");
        Ok(stubs)
    }
}

#[async_trait]
impl ContentExtractor for GuardianScraper {
    async fn fetch_content(&self, url: &str) -> Result<ArticleContent> {
        let html = self.fetcher.fetch(url).await?;
        let content = self.parse_article(&html, url)?;
        info!(%url, chars = content.body.len(), "📄 Extracted article content");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;
    use chrono::TimeZone;

    const FRONT: &str = r#"
        <html><body>
          <div class="fc-item fc-item--standard">
            <a class="fc-item__link" href="/world/2025/apr/20/ceasefire-talks-resume">Ceasefire talks resume in Geneva</a>
            <div class="fc-item__standfirst">Delegations return after a week-long pause</div>
            <picture><img src="https://i.guim.co.uk/ceasefire.jpg"></picture>
          </div>
          <div class="js-snappa-item">
            <h3><a href="https://www.theguardian.com/technology/2025/apr/20/chip-export-rules">Chip export rules tightened</a></h3>
          </div>
          <section>
            <a class="u-faux-block-link__overlay" href="/books/2025/apr/20/spring-reading-list">Spring reading list for the long weekend</a>
            <p>Twelve new novels worth your attention this season</p>
          </section>
        </body></html>"#;

    fn scraper(fetcher: StaticFetcher, sections: &[&str]) -> GuardianScraper {
        let source = Source::new(1, "The Guardian", "guardian", "https://www.theguardian.com/europe", "en")
            .with_sections(sections);
        GuardianScraper::new(source, Arc::new(fetcher))
    }

    #[test]
    fn test_listing_accumulates_every_selector() {
        let page = Url::parse("https://www.theguardian.com/europe").unwrap();
        let stubs = scraper(StaticFetcher::new(), &[]).parse_listing(FRONT, &page).unwrap();

        let urls: Vec<&str> = stubs.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.theguardian.com/world/2025/apr/20/ceasefire-talks-resume",
                "https://www.theguardian.com/technology/2025/apr/20/chip-export-rules",
                "https://www.theguardian.com/books/2025/apr/20/spring-reading-list",
            ]
        );

        assert_eq!(stubs[0].summary.as_deref(), Some("Delegations return after a week-long pause"));
        assert_eq!(stubs[0].image_url.as_deref(), Some("https://i.guim.co.uk/ceasefire.jpg"));
        assert_eq!(stubs[0].categories, vec!["World"]);

        assert_eq!(stubs[1].categories, vec!["Technology"]);
        assert_eq!(stubs[1].image_url.as_deref(), Some(""));

        assert_eq!(stubs[2].title, "Spring reading list for the long weekend");
        assert_eq!(stubs[2].summary.as_deref(), Some("Twelve new novels worth your attention this season"));
        assert_eq!(stubs[2].categories, vec!["Books"]);
    }

    #[test]
    fn test_link_fallback_filters_live_blogs_and_indexes() {
        let html = r#"
            <ul>
              <li><a href="/world/2025/apr/20/election-results-announced">Election results announced today</a></li>
              <li><a href="/world/live/2025/apr/20/election-live">Election live: every update</a></li>
              <li><a href="/world/all">All world news stories here</a></li>
              <li><a href="https://example.com/world/2025/apr/20/other">Someone else's article here</a></li>
              <li><a href="/world/2025/apr/20/x">Short</a></li>
            </ul>"#;
        let page = Url::parse("https://www.theguardian.com/europe").unwrap();
        let stubs = scraper(StaticFetcher::new(), &[]).parse_listing(html, &page).unwrap();

        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].url, "https://www.theguardian.com/world/2025/apr/20/election-results-announced");
    }

    #[tokio::test]
    async fn test_sections_are_merged_and_deduplicated() {
        let technology = r#"
            <div class="fc-item">
              <a class="fc-item__link" href="/technology/2025/apr/20/chip-export-rules">Chip export rules tightened</a>
            </div>
            <div class="fc-item">
              <a class="fc-item__link" href="/technology/2025/apr/20/new-phone-review">New phone review roundup</a>
            </div>"#;
        let fetcher = StaticFetcher::new()
            .with_page("https://www.theguardian.com/europe", FRONT)
            .with_page("https://www.theguardian.com/technology", technology);
        let scraper = scraper(fetcher, &["europe", "technology", "business"]);

        let stubs = scraper.list_articles(Utc::now()).await.unwrap();
        assert_eq!(stubs.len(), 4);
        assert_eq!(stubs[3].url, "https://www.theguardian.com/technology/2025/apr/20/new-phone-review");
    }

    #[test]
    fn test_article_headline_body_and_metadata() {
        let html = r#"
            <html><head><meta name="description" content="Meta description"></head><body>
              <h1 data-component="headline">Ceasefire talks resume in Geneva</h1>
              <time datetime="2025-04-20T10:59:03.000Z">Sun 20 Apr 2025 11.59 BST</time>
              <div data-component="standfirst"><p>Delegations return after a pause</p></div>
              <a data-link-name="article section" href="/world">World news</a>
              <div data-component="body">
                <p>Negotiators arrived on Sunday.</p>
                <figure><p class="caption">Photo: Agency</p></figure>
                <p>Talks are expected to last a week.</p>
              </div>
            </body></html>"#;
        let url = "https://www.theguardian.com/world/2025/apr/20/ceasefire-talks-resume";
        let content = scraper(StaticFetcher::new(), &[]).parse_article(html, url).unwrap();

        assert_eq!(
            content.body,
            "Ceasefire talks resume in Geneva\n\nNegotiators arrived on Sunday.\n\nTalks are expected to last a week."
        );
        assert_eq!(content.metadata.published_at, Some(Utc.with_ymd_and_hms(2025, 4, 20, 10, 59, 3).unwrap()));
        assert_eq!(content.metadata.summary.as_deref(), Some("Delegations return after a pause"));
        assert_eq!(content.metadata.categories, vec!["World news"]);
    }

    #[test]
    fn test_article_defaults_to_news_category() {
        let html = "<h1>Headline</h1><p>This paragraph is long enough to survive the fallback scan.</p>";
        let content = scraper(StaticFetcher::new(), &[])
            .parse_article(html, "https://www.theguardian.com/2025/apr/20")
            .unwrap();
        assert_eq!(content.metadata.categories, vec!["News"]);
        assert_eq!(content.body, "Headline\n\nThis paragraph is long enough to survive the fallback scan.");
    }
}
