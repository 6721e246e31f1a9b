//! Date normalization between canonical text and structured dates.
//!
//! Storage and services exchange dates as ISO-8601 `YYYY-MM-DD` strings;
//! records hold `chrono::NaiveDate`.

use super::ValidationError;
use chrono::{Local, NaiveDate};

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a `YYYY-MM-DD` string, ignoring surrounding whitespace.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT).map_err(|_| ValidationError::InvalidDate {
        value: trimmed.to_string(),
    })
}

/// Parses an optional date; blank input is treated as absent.
pub fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_date(text).map(Some),
    }
}

/// Renders the canonical storage form.
pub fn format_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Current local date, used to close open-ended periods.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Whole days from `start` to `end` (or to `as_of` when `end` is absent).
pub fn period_days(start: NaiveDate, end: Option<NaiveDate>, as_of: NaiveDate) -> i64 {
    (end.unwrap_or(as_of) - start).num_days()
}
