//! UTC calendar-day helpers for daily quota windows.
//!
//! All day boundaries are evaluated in UTC regardless of server locale, so a
//! "day" is the same day for every instance serving the same principal.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

/// Storage format for calendar dates (`YYYY-MM-DD`).
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Current UTC calendar date for the given instant.
#[inline]
pub fn utc_today(now: OffsetDateTime) -> Date {
    now.to_offset(UtcOffset::UTC).date()
}

/// Whether a stored last-usage date falls before the current UTC day.
///
/// An absent or future-dated value counts as a new day; the stored count is
/// then ignored on read and physically reset on the next commit.
pub fn is_new_day(last_usage_date: Option<Date>, now: OffsetDateTime) -> bool {
    match last_usage_date {
        Some(date) => date != utc_today(now),
        None => true,
    }
}

/// Start of the next UTC calendar day (when daily quotas reset).
pub fn next_day_reset(now: OffsetDateTime) -> OffsetDateTime {
    utc_today(now)
        .next_day()
        .map(|d| d.midnight().assume_utc())
        .unwrap_or(now)
}

/// Format a date as `YYYY-MM-DD` for storage.
pub fn format_date(date: Date) -> String {
    date.format(&DATE_FORMAT).unwrap_or_default()
}

/// Parse a stored `YYYY-MM-DD` value. Returns `None` for malformed input.
pub fn parse_date(s: &str) -> Option<Date> {
    Date::parse(s, &DATE_FORMAT).ok()
}
