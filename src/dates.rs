//! Publish-date parsing for front-matter `date` fields.
//!
//! Front-matter dates arrive in a few shapes depending on the author's editor:
//! plain dates, dates with a time, or full RFC 3339 timestamps. Everything is
//! normalized to `YYYY-MM-DD` once at load time; the rest of the build only
//! ever sees the normalized form.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Normalize an accepted date representation to `YYYY-MM-DD`.
///
/// Accepted inputs:
/// - `"2024-06-01"`
/// - `"2024-06-01 09:30:00"`
/// - `"2024-06-01T09:30:00Z"` (and other RFC 3339 offsets)
///
/// Returns `None` for anything else.
pub fn normalize(raw: &str) -> Option<String> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date().format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    None
}

/// Today's date in `YYYY-MM-DD`, used when a post carries no date at all.
pub fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Format a normalized `YYYY-MM-DD` date for display ("June 1, 2024").
///
/// Falls back to the input unchanged if it is not in normalized form.
pub fn display(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}
