//! Value pattern detection and lenient parsing helpers

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::PatternHint;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[\d\s\-()]{10,}$").unwrap());

static URL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://").unwrap());

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

static IP_ADDRESS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").unwrap());

static DATE_ISO_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static DATETIME_ISO_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}").unwrap());

static CURRENCY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[$€£¥]?\d+[.,]?\d*$").unwrap());

static PERCENTAGE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.,]?\d*%$").unwrap());

/// Patterns in evaluation order
///
/// Specific shapes come before loose ones: a phone number regex also accepts
/// ISO dates and an IP address looks like a currency amount to a sloppy eye.
static PATTERNS: Lazy<Vec<(PatternHint, &'static Lazy<Regex>)>> = Lazy::new(|| {
    vec![
        (PatternHint::Email, &EMAIL_REGEX),
        (PatternHint::Url, &URL_REGEX),
        (PatternHint::Uuid, &UUID_REGEX),
        (PatternHint::IpAddress, &IP_ADDRESS_REGEX),
        (PatternHint::DateIso, &DATE_ISO_REGEX),
        (PatternHint::DatetimeIso, &DATETIME_ISO_REGEX),
        (PatternHint::Phone, &PHONE_REGEX),
        (PatternHint::Currency, &CURRENCY_REGEX),
        (PatternHint::Percentage, &PERCENTAGE_REGEX),
    ]
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y%m%d",
    "%b %d, %Y", "%d %b %Y", "%B %d, %Y", "%d %B %Y",
];

/// Whether a single value matches the pattern
pub fn matches_pattern(value: &str, hint: PatternHint) -> bool {
    PATTERNS
        .iter()
        .find(|(h, _)| *h == hint)
        .is_some_and(|(_, re)| re.is_match(value.trim()))
}

/// Fraction of values matching the pattern
pub fn pattern_confidence(values: &[String], hint: PatternHint) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let matches = values.iter().filter(|v| matches_pattern(v, hint)).count();
    matches as f64 / values.len() as f64
}

/// First pattern, in evaluation order, matched by at least `threshold` of the values
pub fn detect_pattern(values: &[String], threshold: f64) -> Option<PatternHint> {
    detect_pattern_where(values, threshold, |_| true)
}

/// [`detect_pattern`] restricted to the patterns `accept` allows
pub fn detect_pattern_where(
    values: &[String],
    threshold: f64,
    accept: impl Fn(PatternHint) -> bool,
) -> Option<PatternHint> {
    if values.is_empty() {
        return None;
    }
    PATTERNS
        .iter()
        .map(|(hint, _)| *hint)
        .filter(|hint| accept(*hint))
        .find(|hint| pattern_confidence(values, *hint) >= threshold)
}

/// Parse a date or datetime in any of the common spreadsheet renderings
///
/// Date-only values resolve to midnight.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parse a number that may carry a currency symbol, percent sign or comma decimal separator
pub fn parse_lenient_number(value: &str) -> Option<f64> {
    let trimmed = value
        .trim()
        .trim_start_matches(['$', '€', '£', '¥'])
        .trim_end_matches('%');
    let normalized = if trimmed.contains('.') {
        trimmed.replace(',', "")
    } else {
        trimmed.replace(',', ".")
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whether the value looks like a JSON object or array and parses as JSON
pub fn looks_like_json(value: &str) -> bool {
    let trimmed = value.trim();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
}
