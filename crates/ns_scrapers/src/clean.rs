use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

lazy_static! {
    static ref BLOCKS: Selector = Selector::parse("p, h1, h2, h3, h4, h5, h6").expect("static selector");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("static regex");
    static ref EXCESS_NEWLINES: Regex = Regex::new(r"\n{3,}").expect("static regex");
}

/// Turns an HTML fragment into readable plain text.
///
/// Paragraphs and headings become blocks separated by a blank line, `<br>`
/// inside a block becomes a newline, and everything else is dropped.
pub fn clean(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(html);
    let blocks: Vec<String> = fragment
        .select(&BLOCKS)
        .map(block_text)
        .filter(|text| !text.is_empty())
        .collect();
    blocks.join("\n\n")
}

/// Text of one block. Source whitespace collapses to single spaces; only
/// `<br>` produces a line break, and at most one blank line survives.
pub(crate) fn block_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(t) => raw.push_str(&WHITESPACE.replace_all(t, " ")),
            Node::Element(e) if e.name() == "br" => raw.push('\n'),
            _ => {}
        }
    }

    let lines: Vec<String> = raw
        .split('\n')
        .map(|line| WHITESPACE.replace_all(line.trim(), " ").into_owned())
        .collect();
    EXCESS_NEWLINES
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_are_separated_by_blank_line() {
        assert_eq!(clean("<p>A</p><br><p>B</p>"), "A\n\nB");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("   \n "), "");
    }

    #[test]
    fn test_line_break_inside_paragraph() {
        assert_eq!(clean("<p>first line<br>second   line</p>"), "first line\nsecond line");
    }

    #[test]
    fn test_headings_kept_and_other_markup_dropped() {
        let html = "<h2>Title</h2><div>ignored</div><p>Body <b>bold</b> text</p><p>   </p>";
        assert_eq!(clean(html), "Title\n\nBody bold text");
    }

    #[test]
    fn test_source_newlines_are_not_line_breaks() {
        assert_eq!(clean("<p>Hello\n    world</p>"), "Hello world");
        assert_eq!(clean("<p>\n  one\n</p>\n\n<h3>two\n three</h3>"), "one\n\ntwo three");
    }

    #[test]
    fn test_excess_newlines_collapse() {
        let html = "<p>a<br><br><br><br>b</p>";
        assert_eq!(clean(html), "a\n\nb");
    }
}
