use scraper::{ElementRef, Selector};
use serde_json::Value;

use super::utils::push_unique;
use super::PageMetadata;
use crate::heuristics::dates::parse_timestamp_attr;

/// Article fields published as JSON-LD (`<script type="application/ld+json">`).
#[derive(Debug, Default, PartialEq)]
pub struct LinkedData {
    pub date_published: Option<String>,
    pub description: Option<String>,
    pub sections: Vec<String>,
}

/// Reads the first article-like JSON-LD object on the page.
/// Objects may be top-level, inside an array or inside `@graph`.
pub fn extract_linked_data(root: ElementRef<'_>) -> LinkedData {
    let mut data = LinkedData::default();

    let Ok(script_selector) = Selector::parse("script[type='application/ld+json']") else {
        return data;
    };

    for script in root.select(&script_selector) {
        let Ok(json) = serde_json::from_str::<Value>(script.text().collect::<String>().trim()) else {
            continue;
        };

        for object in candidates(&json) {
            if data.date_published.is_none() {
                data.date_published = object.get("datePublished").and_then(Value::as_str).map(str::to_string);
            }
            if data.description.is_none() {
                data.description = object
                    .get("description")
                    .and_then(Value::as_str)
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty());
            }
            match object.get("articleSection") {
                Some(Value::String(s)) => push_unique(&mut data.sections, s.clone()),
                Some(Value::Array(sections)) => {
                    for s in sections.iter().filter_map(Value::as_str) {
                        push_unique(&mut data.sections, s.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    data
}

fn candidates(json: &Value) -> Vec<&Value> {
    match json {
        Value::Array(items) => items.iter().flat_map(candidates).collect(),
        Value::Object(object) => match object.get("@graph") {
            Some(graph) => candidates(graph),
            None => vec![json],
        },
        _ => Vec::new(),
    }
}

/// Fills fields the page-specific selectors left empty.
pub fn fill_metadata(metadata: &mut PageMetadata, data: LinkedData) {
    if metadata.published_at.is_none() {
        metadata.published_at = data.date_published.as_deref().and_then(parse_timestamp_attr);
    }
    if metadata.summary.is_none() {
        metadata.summary = data.description;
    }
    if metadata.categories.is_empty() {
        for section in data.sections {
            push_unique(&mut metadata.categories, section);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use scraper::Html;

    #[test]
    fn test_graph_and_section_array() {
        let html = Html::parse_document(
            r#"<script type="application/ld+json">
               {"@context": "https://schema.org", "@graph": [
                 {"@type": "WebPage", "name": "Home"},
                 {"@type": "NewsArticle", "datePublished": "2025-04-20T08:00:00Z",
                  "description": " Lead text ", "articleSection": ["World", "Europe", "World"]}
               ]}
               </script>"#,
        );
        let data = extract_linked_data(html.root_element());
        assert_eq!(data.date_published.as_deref(), Some("2025-04-20T08:00:00Z"));
        assert_eq!(data.description.as_deref(), Some("Lead text"));
        assert_eq!(data.sections, vec!["World", "Europe"]);
    }

    #[test]
    fn test_invalid_json_is_ignored() {
        let html = Html::parse_document(r#"<script type="application/ld+json">{not json</script>"#);
        assert_eq!(extract_linked_data(html.root_element()), LinkedData::default());
    }

    #[test]
    fn test_fill_only_missing_fields() {
        let mut metadata = PageMetadata {
            summary: Some("From the page".to_string()),
            ..Default::default()
        };
        fill_metadata(
            &mut metadata,
            LinkedData {
                date_published: Some("2025-04-20T08:00:00Z".to_string()),
                description: Some("From JSON-LD".to_string()),
                sections: vec!["World".to_string()],
            },
        );
        assert_eq!(metadata.summary.as_deref(), Some("From the page"));
        assert_eq!(metadata.published_at, Some(Utc.with_ymd_and_hms(2025, 4, 20, 8, 0, 0).unwrap()));
        assert_eq!(metadata.categories, vec!["World"]);
    }
}
