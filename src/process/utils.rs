use once_cell::sync::Lazy;
use regex::Regex;

/// Marker the source uses for a missing observation.
pub const MISSING_MARKER: &str = "..";
pub const THOUSANDS_SEPARATOR: char = ',';

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Trim and collapse internal whitespace runs (newlines, nbsp, tabs) to a
/// single space.
pub fn clean_text(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw.trim(), " ").into_owned()
}

/// Map a raw cell to the text handed to the numeric parser, or `None` for a
/// missing observation.
pub fn clean_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == MISSING_MARKER {
        return None;
    }
    if trimmed.contains(THOUSANDS_SEPARATOR) {
        Some(trimmed.replace(THOUSANDS_SEPARATOR, ""))
    } else {
        Some(trimmed.to_string())
    }
}
