//! Formatting utilities for file sizes and dates.

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;
use std::fmt::Write;

/// Month/day/year without zero padding, e.g. `1/15/2024`.
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Human-readable size at 1024 thresholds (`"512 B"`, `"2.0 KB"`, `"1.5 MB"`).
pub fn format_size(bytes: u64) -> String {
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    }
}

/// `true` if chrono understands every specifier in `pattern`.
pub fn is_valid_date_format(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// Formats a modification time with a strftime pattern from the config.
///
/// An unusable pattern falls back to [`DEFAULT_DATE_FORMAT`].
pub fn format_date(timestamp: &NaiveDateTime, pattern: &str) -> String {
    let pattern = if is_valid_date_format(pattern) {
        pattern
    } else {
        DEFAULT_DATE_FORMAT
    };
    let mut out = String::new();
    if write!(out, "{}", timestamp.format(pattern)).is_err() {
        out.clear();
        let _ = write!(out, "{}", timestamp.format(DEFAULT_DATE_FORMAT));
    }
    out
}
