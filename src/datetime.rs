//! Date/time utilities for Gator.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! precision, so comparing the stored text orders rows chronologically on
//! every backend.

use std::fmt::{self, Write};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

use crate::{GatorError, Result};

/// Encode a timestamp for storage.
pub fn to_db(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Encode the current time for storage.
pub fn now_db() -> String {
    to_db(&Utc::now())
}

/// Decode a stored timestamp.
pub fn from_db(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

/// Parse a feed item's publish date.
///
/// RSS dates are RFC 2822; RFC 3339 is the only other form accepted.
/// Everything else is rejected so the caller can substitute a fallback.
pub fn parse_pub_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Check that `format` is a usable chrono strftime string.
pub fn validate_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(GatorError::Config(format!("invalid date format {format:?}")));
    }
    Ok(())
}

/// Format a DateTime<Utc> in the specified timezone.
///
/// Falls back to UTC when the timezone name is unknown, and to RFC 3339 when
/// the format string cannot be rendered.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let formatted = match timezone.parse::<Tz>() {
        Ok(tz) => render(&dt.with_timezone(&tz), format),
        Err(_) => render(dt, format),
    };
    formatted.unwrap_or_else(|| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn render<T: TimeZone>(dt: &DateTime<T>, format: &str) -> Option<String>
where
    T::Offset: fmt::Display,
{
    let mut out = String::new();
    write!(out, "{}", dt.format(format)).ok()?;
    Some(out)
}
