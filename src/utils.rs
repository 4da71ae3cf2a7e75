//! Utility functions for timestamp handling, string manipulation, and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - ISO-8601 parsing of article publication times into local time
//! - Short `DD/MM HH:MM` display formatting for digest rows
//! - String truncation for logging HTTP error bodies
//! - File system validation for the working directory

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Offset layouts RFC 3339 rejects, such as `+0530` without a colon.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// Naive (offset-less) layouts accepted for `published`, tried in order.
const NAIVE_FORMATS: [&str; 7] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S",
];

/// Parse an ISO-8601 publication timestamp into local wall-clock time.
///
/// Timestamps carrying an offset are converted to the process timezone.
/// Naive timestamps are taken to already be local. A bare date is read as
/// midnight.
///
/// # Returns
///
/// `None` when the value matches none of the accepted layouts.
pub fn parse_published(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Local).naive_local());
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Render a publication timestamp as `DD/MM HH:MM` in local time.
///
/// # Returns
///
/// `None` if the timestamp cannot be parsed; callers decide the fallback.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(display_timestamp("2024-03-05T09:07:00").as_deref(), Some("05/03 09:07"));
/// ```
pub fn display_timestamp(raw: &str) -> Option<String> {
    parse_published(raw).map(|dt| dt.format("%d/%m %H:%M").to_string())
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes (backing off to a char
/// boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a scratch file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;

    let scratch_path = path.join("..__write_check__");
    match stdfs::File::create(&scratch_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&scratch_path);
            info!("Working directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
