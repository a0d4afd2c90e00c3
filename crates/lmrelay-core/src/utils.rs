//! Utility helpers — path resolution, timestamp formatting, string manipulation.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Get the lmrelay data directory (e.g. `~/.lmrelay/`).
pub fn get_data_path() -> PathBuf {
    let home = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".lmrelay")
}

/// Format a timestamp for storage.
///
/// Fixed precision and a `Z` suffix keep stored values lexicographically
/// ordered, which the store relies on for `MAX()` comparisons.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 and naive `YYYY-MM-DDTHH:MM:SS[.ffffff]` values, the
/// latter read as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(|ts| ts.and_utc())
        })
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(rest)
    } else if path == "~" {
        dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."))
    } else {
        PathBuf::from(path)
    }
}
