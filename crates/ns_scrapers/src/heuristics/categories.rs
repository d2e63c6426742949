use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

/// Slug to display-name pairs, checked in order.
pub type CategoryTable = &'static [(&'static str, &'static str)];

pub const NOVINKY_CATEGORIES: CategoryTable = &[
    ("stalo", "Stalo se"),
    ("domaci", "Domácí"),
    ("volby", "Volby"),
    ("zahranicni", "Zahraniční"),
    ("valka", "Válka na Ukrajině"),
    ("krimi", "Krimi"),
    ("ekonomika", "Ekonomika"),
];

pub const GUARDIAN_SECTIONS: CategoryTable = &[
    ("technology", "Technology"),
    ("business", "Business"),
    ("money", "Money"),
    ("environment", "Environment"),
    ("world", "World"),
    ("europe", "Europe"),
    ("uk-news", "UK News"),
    ("us-news", "US News"),
    ("politics", "Politics"),
    ("sport", "Sport"),
    ("football", "Football"),
    ("science", "Science"),
    ("global-development", "Global Development"),
];

lazy_static! {
    static ref NOVINKY_ARTICLE_SLUG: Regex = Regex::new(r"/clanek/([^/?#]+)").expect("static regex");
    static ref MONTH_ABBREVIATION: Regex = Regex::new(r"^[a-z]{3}$").expect("static regex");
}

pub fn lookup(table: CategoryTable, slug: &str) -> Option<&'static str> {
    table.iter().find(|(s, _)| *s == slug).map(|(_, name)| *name)
}

/// `"uk-news"` -> `"Uk News"`.
pub fn title_case_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Novinky article slugs start with their section: `/clanek/domaci-...-40512345`.
pub fn novinky_category_from_url(url: &str, table: CategoryTable) -> Option<String> {
    let captures = NOVINKY_ARTICLE_SLUG.captures(url)?;
    let prefix = captures[1].split('-').next().filter(|p| !p.is_empty())?;
    Some(lookup(table, prefix).map(str::to_string).unwrap_or_else(|| capitalize(prefix)))
}

/// Guardian section from an article URL: known sections first, then the
/// first path segment that is not a date component or `article`.
pub fn guardian_category_from_url(url: &str, table: CategoryTable) -> Option<String> {
    if let Some((_, name)) = table.iter().find(|(slug, _)| url.contains(&format!("/{}/", slug))) {
        return Some(name.to_string());
    }

    let segments = path_segments(url);
    if let Some(name) = segments.iter().find_map(|s| lookup(table, s)) {
        return Some(name.to_string());
    }

    segments
        .iter()
        .find(|s| {
            *s != "article"
                && !s.chars().all(|c| c.is_ascii_digit())
                && !MONTH_ABBREVIATION.is_match(s)
        })
        .map(|s| title_case_slug(s))
}

/// First meaningful path segment, title-cased. Numeric segments are skipped.
pub fn generic_category_from_url(url: &str) -> Option<String> {
    path_segments(url)
        .into_iter()
        .find(|s| !s.chars().all(|c| c.is_ascii_digit()) && s.chars().any(char::is_alphabetic))
        .map(|s| title_case_slug(&s))
}

fn path_segments(url: &str) -> Vec<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .map(|segments| segments.filter(|s| !s.is_empty()).map(str::to_string).collect())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case_slug() {
        assert_eq!(title_case_slug("uk-news"), "Uk News");
        assert_eq!(title_case_slug("global-development"), "Global Development");
        assert_eq!(title_case_slug("WORLD"), "World");
    }

    #[test]
    fn test_novinky_table_and_fallback() {
        let url = "https://www.novinky.cz/clanek/domaci-vlada-schvalila-rozpocet-40512345";
        assert_eq!(novinky_category_from_url(url, NOVINKY_CATEGORIES).as_deref(), Some("Domácí"));

        let url = "https://www.novinky.cz/clanek/kultura-nova-vystava-40512346";
        assert_eq!(novinky_category_from_url(url, NOVINKY_CATEGORIES).as_deref(), Some("Kultura"));

        assert_eq!(novinky_category_from_url("https://www.novinky.cz/", NOVINKY_CATEGORIES), None);
    }

    #[test]
    fn test_tables_are_overridable() {
        const CUSTOM: CategoryTable = &[("kultura", "Kultura a umění")];
        let url = "https://www.novinky.cz/clanek/kultura-nova-vystava-40512346";
        assert_eq!(novinky_category_from_url(url, CUSTOM).as_deref(), Some("Kultura a umění"));
    }

    #[test]
    fn test_guardian_sections() {
        let url = "https://www.theguardian.com/world/2025/apr/20/some-story";
        assert_eq!(guardian_category_from_url(url, GUARDIAN_SECTIONS).as_deref(), Some("World"));

        let url = "https://www.theguardian.com/uk-news/2025/apr/20/some-story";
        assert_eq!(guardian_category_from_url(url, GUARDIAN_SECTIONS).as_deref(), Some("UK News"));

        let url = "https://www.theguardian.com/books/2025/apr/20/some-story";
        assert_eq!(guardian_category_from_url(url, GUARDIAN_SECTIONS).as_deref(), Some("Books"));

        let url = "https://www.theguardian.com/2025/apr/20";
        assert_eq!(guardian_category_from_url(url, GUARDIAN_SECTIONS), None);
    }

    #[test]
    fn test_generic_category() {
        let url = "https://www.pravda.com.ua/news/2025/04/13/7493091/";
        assert_eq!(generic_category_from_url(url).as_deref(), Some("News"));
        assert_eq!(generic_category_from_url("https://www.pravda.com.ua/"), None);
    }
}
