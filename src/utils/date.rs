//! Date parsing and formatting for front matter values.
//!
//! Front matter dates arrive as plain strings (`2024-06-15`,
//! `2024-06-15 14:30:00`, RFC 3339). They are interpreted as UTC when no
//! offset is given.

use chrono::{
    DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc,
    format::{Item, StrftimeItems},
};

use crate::error::{Error, Result};

/// Naive formats tried after RFC 3339, in order.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a front matter date into UTC.
pub fn parse(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Like [`parse`], failing with [`Error::InvalidDate`].
pub fn parse_strict(value: &str) -> Result<DateTime<Utc>> {
    parse(value).ok_or_else(|| Error::InvalidDate {
        value: value.to_owned(),
    })
}

/// Format a date string with a strftime pattern.
pub fn format(value: &str, pattern: &str) -> Result<String> {
    let date = parse_strict(value)?;

    // Unknown specifiers make `DelayedFormat` fail at display time, which
    // would panic inside `to_string`.
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(Error::InvalidDate {
            value: format!("{value} (bad format `{pattern}`)"),
        });
    }

    Ok(date.format_with_items(items.into_iter()).to_string())
}

/// Current time as an RFC 3339 string.
pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `YYYY-MM-DD` of a parsed date, as used in tag URIs.
pub fn ymd(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}
