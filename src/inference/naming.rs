//! Identifier cleaning for table and column names

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]").unwrap());
static UNDERSCORES_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

const RESERVED_TABLE_NAMES: &[&str] = &["table", "index", "view", "trigger", "user", "order", "group"];
const RESERVED_COLUMN_NAMES: &[&str] = &["index", "order", "group", "select", "from", "where"];

fn clean_identifier(raw: &str, prefix: &str, reserved: &[&str], reserved_suffix: &str) -> String {
    let replaced = NON_WORD_REGEX.replace_all(raw.trim(), "_");
    let collapsed = UNDERSCORES_REGEX.replace_all(&replaced, "_");
    let mut clean = collapsed.trim_matches('_').to_lowercase();

    if clean.is_empty() || clean.starts_with(|c: char| c.is_ascii_digit()) {
        clean = format!("{prefix}_{clean}");
    }
    if reserved.contains(&clean.as_str()) {
        clean = format!("{clean}{reserved_suffix}");
    }
    clean
}

/// Clean a sheet or stream name into a table identifier
///
/// # Example
///
/// ```rust
/// use data_import_sdk::inference::clean_table_name;
///
/// assert_eq!(clean_table_name("Sales Data (2024)"), "sales_data_2024");
/// assert_eq!(clean_table_name("Order"), "order_tbl");
/// ```
pub fn clean_table_name(raw: &str) -> String {
    clean_identifier(raw, "table", RESERVED_TABLE_NAMES, "_tbl")
}

/// Clean a header into a column identifier
pub fn clean_column_name(raw: &str) -> String {
    clean_identifier(raw, "col", RESERVED_COLUMN_NAMES, "_col")
}

/// Clean every header, suffixing repeats so the result stays unique
pub fn clean_column_names(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|name| {
            let base = clean_column_name(name);
            let mut candidate = base.clone();
            let mut n = 2;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{base}_{n}");
                n += 1;
            }
            candidate
        })
        .collect()
}
