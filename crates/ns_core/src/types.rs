use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news site the engine knows how to crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    /// Identifier the scraper registry resolves against.
    pub slug: String,
    pub base_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Extra listing-page paths crawled after the base URL.
    #[serde(default)]
    pub sections: Vec<String>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_active() -> bool {
    true
}

impl Source {
    pub fn new(id: i64, name: &str, slug: &str, base_url: &str, language: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
            base_url: base_url.to_string(),
            language: language.to_string(),
            active: true,
            sections: Vec::new(),
        }
    }

    pub fn with_sections(mut self, sections: &[&str]) -> Self {
        self.sections = sections.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Minimal article data lifted from a listing page. Lives for one run only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleStub {
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
    /// `None` means the listing did not look for an image at all,
    /// `Some("")` means it looked and found nothing. The latter clears a stored image.
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
    /// Full body text, when the listing already carries it.
    pub content: Option<String>,
}

impl ArticleStub {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub source_id: i64,
    pub summary: String,
    /// Plain text, paragraphs separated by a blank line. Empty until extracted.
    pub content: String,
    pub image_url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArticleRecord {
    pub fn new(url: &str, source_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            url: url.to_string(),
            title: String::new(),
            source_id,
            summary: String::new(),
            content: String::new(),
            image_url: String::new(),
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl Category {
    /// Builds an unsaved category, deriving its slug from the name.
    pub fn new(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            slug: slugify_category(name),
        }
    }
}

/// Lowercases, turns spaces into hyphens and drops anything that is not
/// alphanumeric or a hyphen.
pub fn slugify_category(name: &str) -> String {
    name.to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect()
}

/// Summary of one scrape of one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    pub id: i64,
    pub source_id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub articles_found: u32,
    pub articles_added: u32,
    pub articles_updated: u32,
    pub errors: String,
    pub success: bool,
}

impl RunLog {
    pub fn start(source_id: i64) -> Self {
        Self {
            id: 0,
            source_id,
            started_at: Utc::now(),
            finished_at: None,
            articles_found: 0,
            articles_added: 0,
            articles_updated: 0,
            errors: String::new(),
            success: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_category() {
        assert_eq!(slugify_category("UK News"), "uk-news");
        assert_eq!(slugify_category("Stalo se"), "stalo-se");
        assert_eq!(slugify_category("Válka na Ukrajině"), "válka-na-ukrajině");
        assert_eq!(slugify_category("Science & Tech!"), "science--tech");
    }

    #[test]
    fn test_category_new_derives_slug() {
        let category = Category::new("Global Development");
        assert_eq!(category.id, 0);
        assert_eq!(category.slug, "global-development");
    }

    #[test]
    fn test_run_log_starts_unfinished() {
        let log = RunLog::start(7);
        assert_eq!(log.source_id, 7);
        assert!(!log.success);
        assert!(!log.is_finished());
        assert_eq!(log.articles_found, 0);
    }

    #[test]
    fn test_source_deserializes_with_defaults() {
        let source: Source = serde_json::from_str(
            r#"{"name": "Pravda", "slug": "pravda", "base_url": "https://www.pravda.com.ua/"}"#,
        )
        .unwrap();
        assert!(source.active);
        assert_eq!(source.language, "en");
        assert!(source.sections.is_empty());
    }
}
