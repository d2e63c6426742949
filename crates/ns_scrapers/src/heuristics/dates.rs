use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// Words a source uses for relative publish times on its listing pages.
#[derive(Debug, Clone, Copy)]
pub struct RelativeVocabulary {
    pub today: &'static [&'static str],
    pub yesterday: &'static [&'static str],
    /// Weekday abbreviations. The listings only show these for the current day.
    pub weekdays: &'static [&'static str],
}

pub const CZECH: RelativeVocabulary = RelativeVocabulary {
    today: &["dnes"],
    yesterday: &["včera"],
    weekdays: &["po", "út", "st", "čt", "pá", "so", "ne"],
};

pub const ENGLISH: RelativeVocabulary = RelativeVocabulary {
    today: &["today"],
    yesterday: &["yesterday"],
    weekdays: &["mon", "tue", "wed", "thu", "fri", "sat", "sun"],
};

const UKRAINIAN_MONTHS: &[(&str, u32)] = &[
    ("січня", 1),
    ("лютого", 2),
    ("березня", 3),
    ("квітня", 4),
    ("травня", 5),
    ("червня", 6),
    ("липня", 7),
    ("серпня", 8),
    ("вересня", 9),
    ("жовтня", 10),
    ("листопада", 11),
    ("грудня", 12),
];

const ENGLISH_MONTHS: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\p{L}+").expect("static regex");
    static ref CLOCK: Regex = Regex::new(r"(\d{1,2})[:.](\d{2})").expect("static regex");
    static ref BARE_CLOCK: Regex = Regex::new(r"^\s*\d{1,2}:\d{2}\s*$").expect("static regex");
    static ref ISO_IN_TEXT: Regex =
        Regex::new(r"(\d{4})-(\d{2})-(\d{2})(?:[T ](\d{1,2}):(\d{2}))?").expect("static regex");
    static ref DAY_MONTH_YEAR: Regex =
        Regex::new(r"(?i)\b(\d{1,2})\s+([a-z]{3,9})\.?\s+(\d{4})(?:\D{1,6}(\d{1,2})[:.](\d{2}))?")
            .expect("static regex");
    static ref MONTH_DAY_YEAR: Regex =
        Regex::new(r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2}),?\s+(\d{4})(?:\D{1,6}(\d{1,2})[:.](\d{2}))?")
            .expect("static regex");
    static ref DOTTED: Regex =
        Regex::new(r"(\d{1,2})\.\s*(\d{1,2})\.\s*(\d{4})(?:\D{1,6}(\d{1,2})[:.](\d{2}))?")
            .expect("static regex");
    static ref UKRAINIAN_DATE: Regex =
        Regex::new(r"(\d{1,2})\s+(\p{L}+)\s+(\d{4})(?:\D{1,6}(\d{1,2}):(\d{2}))?").expect("static regex");
}

/// Parses machine-readable values found in `datetime` / `data-timestamp`
/// attributes: RFC 3339, RFC 2822, naive ISO forms and epoch seconds/millis.
pub fn parse_timestamp_attr(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    // Shorter digit runs are years or day numbers, not epoch values.
    if value.len() >= 9 && value.chars().all(|c| c.is_ascii_digit()) {
        let n: i64 = value.parse().ok()?;
        return if value.len() >= 12 {
            Utc.timestamp_millis_opt(n).single()
        } else {
            Utc.timestamp_opt(n, 0).single()
        };
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Best-effort parse of a date embedded in free text.
pub fn parse_fuzzy(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    parse_timestamp_attr(text)
        .or_else(|| {
            let c = ISO_IN_TEXT.captures(text)?;
            build(number(&c, 1)?, number(&c, 2)?, number(&c, 3)?, &c, 4)
        })
        .or_else(|| {
            let c = DAY_MONTH_YEAR.captures(text)?;
            build(number(&c, 3)?, english_month(&c[2])?, number(&c, 1)?, &c, 4)
        })
        .or_else(|| {
            let c = MONTH_DAY_YEAR.captures(text)?;
            build(number(&c, 3)?, english_month(&c[1])?, number(&c, 2)?, &c, 4)
        })
        .or_else(|| {
            let c = DOTTED.captures(text)?;
            build(number(&c, 3)?, number(&c, 2)?, number(&c, 1)?, &c, 4)
        })
}

/// True when the text uses the source's relative vocabulary or is a bare clock time.
pub fn is_relative(text: &str, vocab: &RelativeVocabulary) -> bool {
    let lowered = text.to_lowercase();
    BARE_CLOCK.is_match(&lowered)
        || WORD.find_iter(&lowered).any(|w| {
            let w = w.as_str();
            vocab.today.contains(&w) || vocab.yesterday.contains(&w) || vocab.weekdays.contains(&w)
        })
}

/// Resolves "today 9:53" style text against the run time.
pub fn parse_relative(text: &str, vocab: &RelativeVocabulary, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lowered = text.to_lowercase();
    let yesterday = WORD
        .find_iter(&lowered)
        .any(|w| vocab.yesterday.contains(&w.as_str()));

    let day = if yesterday {
        now.date_naive().pred_opt()?
    } else {
        now.date_naive()
    };

    let c = CLOCK.captures(&lowered)?;
    let naive = day.and_hms_opt(number(&c, 1)?, number(&c, 2)?, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Listing-page date text. An explicit calendar date always wins; relative
/// vocabulary is only consulted when the text carries none.
pub fn resolve_date_text(text: &str, vocab: &RelativeVocabulary, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if has_explicit_date(text) {
        parse_fuzzy(text)
    } else if is_relative(text, vocab) {
        parse_relative(text, vocab, now)
    } else {
        parse_fuzzy(text)
    }
}

fn has_explicit_date(text: &str) -> bool {
    ISO_IN_TEXT.is_match(text)
        || DOTTED.is_match(text)
        || DAY_MONTH_YEAR.is_match(text)
        || MONTH_DAY_YEAR.is_match(text)
}

/// Parses "13 квітня 2025, 10:15" style dates with genitive month names.
pub fn parse_ukrainian(text: &str) -> Option<DateTime<Utc>> {
    let lowered = text.to_lowercase();
    let c = UKRAINIAN_DATE.captures(&lowered)?;
    let month = UKRAINIAN_MONTHS
        .iter()
        .find(|(name, _)| *name == &c[2])
        .map(|(_, m)| *m)?;
    build(number(&c, 3)?, month, number(&c, 1)?, &c, 4)
}

fn english_month(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    ENGLISH_MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|i| i as u32 + 1)
}

fn number<T: std::str::FromStr>(captures: &Captures<'_>, index: usize) -> Option<T> {
    captures.get(index)?.as_str().parse().ok()
}

/// Builds a UTC timestamp; the optional clock starts at capture group `clock`.
fn build(year: i32, month: u32, day: u32, captures: &Captures<'_>, clock: usize) -> Option<DateTime<Utc>> {
    let hour = number(captures, clock).unwrap_or(0);
    let minute = number(captures, clock + 1).unwrap_or(0);
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}
