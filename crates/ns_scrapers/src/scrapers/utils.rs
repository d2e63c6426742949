use std::collections::HashSet;

use lazy_static::lazy_static;
use ns_core::{ArticleStub, Error, Result};
use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::clean::block_text;

/// Class/style fragments that mark a node as page furniture rather than body text.
pub const NON_BODY_MARKERS: &[&str] = &[
    "byline",
    "caption",
    "signoff",
    "sign-off",
    "social",
    "related",
    "share",
    "meta",
    "author",
    "date",
    "comments",
    "publication",
];

/// Paragraphs shorter than this are ignored by the page-wide fallback scan.
pub const FALLBACK_MIN_CHARS: usize = 30;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("static regex");
    static ref BACKGROUND_URL: Regex =
        Regex::new(r#"background(?:-image)?\s*:\s*url\(['"]?([^'")]+)['"]?\)"#).expect("static regex");
}

/// How a list of container selectors is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorPolicy {
    /// Stop at the first selector that matches anything.
    FirstMatch,
    /// Collect matches from every selector.
    Accumulate,
}

/// Where to look for a thumbnail and which attributes may hold its URL.
pub struct ImageRules {
    pub selectors: &'static [&'static str],
    pub attributes: &'static [&'static str],
    /// Also accept `background: url(...)` in inline styles.
    pub background: bool,
}

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Extraction(format!("Invalid selector '{}': {}", css, e)))
}

/// Element text with whitespace runs collapsed.
pub fn text_of(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    WHITESPACE.replace_all(raw.trim(), " ").into_owned()
}

/// Non-empty, trimmed attribute value.
pub fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name).map(str::trim).filter(|v| !v.is_empty())
}

pub fn select_containers<'a>(
    scope: ElementRef<'a>,
    selectors: &[&str],
    policy: SelectorPolicy,
) -> Result<Vec<ElementRef<'a>>> {
    let mut found = Vec::new();
    for css in selectors {
        let matches: Vec<ElementRef<'a>> = scope.select(&selector(css)?).collect();
        debug!(selector = css, count = matches.len(), "Container selector evaluated");
        if matches.is_empty() {
            continue;
        }
        found.extend(matches);
        if policy == SelectorPolicy::FirstMatch {
            break;
        }
    }
    Ok(found)
}

/// First element matched by the first selector that matches anything.
pub fn select_first<'a>(scope: ElementRef<'a>, selectors: &[&str]) -> Result<Option<ElementRef<'a>>> {
    for css in selectors {
        if let Some(element) = scope.select(&selector(css)?).next() {
            return Ok(Some(element));
        }
    }
    Ok(None)
}

/// First non-empty text among the selectors, in order.
pub fn first_text(scope: ElementRef<'_>, selectors: &[&str]) -> Result<Option<String>> {
    for css in selectors {
        if let Some(element) = scope.select(&selector(css)?).next() {
            let text = text_of(element);
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
    }
    Ok(None)
}

/// `content` of the first matching `<meta>` tag.
pub fn meta_content(scope: ElementRef<'_>, selectors: &[&str]) -> Result<Option<String>> {
    for css in selectors {
        if let Some(value) = scope.select(&selector(css)?).find_map(|m| attr(m, "content")) {
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

pub fn resolve_href(page: &Url, href: &str) -> Result<String> {
    Ok(page.join(href.trim())?.to_string())
}

/// True when `url` lives on the same site as `base`, ignoring a `www.` prefix.
pub fn same_site(url: &str, base: &Url) -> bool {
    let site = base.host_str().unwrap_or_default().trim_start_matches("www.");
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h == site || h.ends_with(&format!(".{}", site))))
        .unwrap_or(false)
}

/// Up to `levels` element ancestors, nearest first.
pub fn ancestors(element: ElementRef<'_>, levels: usize) -> Vec<ElementRef<'_>> {
    element.ancestors().filter_map(ElementRef::wrap).take(levels).collect()
}

fn first_srcset_url(srcset: &str) -> Option<&str> {
    srcset
        .split_whitespace()
        .next()
        .map(|u| u.trim_end_matches(','))
        .filter(|u| !u.is_empty())
}

pub fn find_image(scope: ElementRef<'_>, rules: &ImageRules) -> Result<Option<String>> {
    for css in rules.selectors {
        let Some(image) = scope.select(&selector(css)?).next() else {
            continue;
        };
        for name in rules.attributes {
            let Some(value) = attr(image, name) else {
                continue;
            };
            let value = if name.contains("srcset") { first_srcset_url(value) } else { Some(value) };
            if let Some(value) = value {
                return Ok(Some(value.to_string()));
            }
        }
    }

    if rules.background {
        for styled in scope.select(&selector("[style*=\"background\"]")?) {
            let style = styled.value().attr("style").unwrap_or_default();
            if let Some(captures) = BACKGROUND_URL.captures(style) {
                return Ok(Some(captures[1].trim().to_string()));
            }
        }
    }

    Ok(None)
}

/// Searches the element's ancestors, nearest first, for an image.
pub fn find_image_near(element: ElementRef<'_>, rules: &ImageRules, levels: usize) -> Result<Option<String>> {
    for scope in ancestors(element, levels) {
        if let Some(image) = find_image(scope, rules)? {
            return Ok(Some(image));
        }
    }
    Ok(None)
}

/// Nearest paragraph around an element that is not the title and is long enough.
pub fn find_summary_near(
    element: ElementRef<'_>,
    css: &str,
    title: &str,
    min_chars: usize,
    levels: usize,
) -> Result<Option<String>> {
    let paragraphs = selector(css)?;
    for scope in ancestors(element, levels) {
        if let Some(paragraph) = scope.select(&paragraphs).next() {
            let text = text_of(paragraph);
            if text != title && text.chars().count() > min_chars {
                return Ok(Some(text));
            }
        }
    }
    Ok(None)
}

fn is_non_body(element: ElementRef<'_>, container: ElementRef<'_>) -> bool {
    let marked = |e: ElementRef<'_>| {
        let class = e.value().attr("class").unwrap_or_default();
        let style = e.value().attr("style").unwrap_or_default();
        NON_BODY_MARKERS.iter().any(|m| class.contains(m) || style.contains(m))
    };

    if marked(element) {
        return true;
    }
    element
        .ancestors()
        .take_while(|node| node.id() != container.id())
        .filter_map(ElementRef::wrap)
        .any(marked)
}

fn body_paragraphs(container: ElementRef<'_>, blocks: &Selector, min_chars: usize) -> Vec<String> {
    container
        .select(blocks)
        .filter(|block| !is_non_body(*block, container))
        .map(block_text)
        .filter(|text| !text.is_empty() && text.chars().count() >= min_chars)
        .collect()
}

/// Paragraph and subheading text from the first container selector that
/// yields more than one paragraph. Empty when none qualifies.
pub fn extract_body(root: ElementRef<'_>, containers: &[&str], min_chars: usize) -> Result<Vec<String>> {
    let blocks = selector("p, h2, h3, h4")?;
    for css in containers {
        let matched: Vec<ElementRef<'_>> = root.select(&selector(css)?).collect();
        if matched.is_empty() {
            continue;
        }
        let paragraphs: Vec<String> = matched
            .iter()
            .flat_map(|container| body_paragraphs(*container, &blocks, min_chars))
            .collect();
        debug!(selector = css, paragraphs = paragraphs.len(), "Body container evaluated");
        if paragraphs.len() > 1 {
            return Ok(paragraphs);
        }
    }
    Ok(Vec::new())
}

/// Page-wide `<p>` scan used when no body container qualifies.
pub fn paragraph_fallback(root: ElementRef<'_>) -> Result<Vec<String>> {
    warn!("No body container qualified, scanning all paragraphs");
    Ok(root
        .select(&selector("p")?)
        .map(block_text)
        .filter(|text| text.chars().count() > FALLBACK_MIN_CHARS)
        .collect())
}

/// Runs `extract` on each element, skipping (and logging) the ones that fail.
pub fn collect_isolated<'a, I, F>(elements: I, mut extract: F) -> Vec<ArticleStub>
where
    I: IntoIterator<Item = ElementRef<'a>>,
    F: FnMut(ElementRef<'a>) -> Result<Option<ArticleStub>>,
{
    let mut stubs = Vec::new();
    for element in elements {
        match extract(element) {
            Ok(Some(stub)) => stubs.push(stub),
            Ok(None) => {}
            Err(e) => warn!(element = element.value().name(), error = %e, "Skipping malformed listing element"),
        }
    }
    stubs
}

/// Keeps the first stub seen for each URL.
pub fn dedup_stubs(stubs: Vec<ArticleStub>) -> Vec<ArticleStub> {
    let mut seen = HashSet::new();
    stubs.into_iter().filter(|stub| seen.insert(stub.url.clone())).collect()
}

pub fn push_unique(values: &mut Vec<String>, value: String) {
    let value = value.trim().to_string();
    if !value.is_empty() && !values.contains(&value) {
        values.push(value);
    }
}
