//! Input validation utilities.
//!
//! Every value that arrives as text (from a file row or from the prompt) is coerced here once,
//! so the store only ever sees typed values.

use crate::constants::DATE_FORMAT;
use crate::{RecordError, RecordResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Parses a calendar date in `YYYY-MM-DD` form.
///
/// Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns `RecordError::InvalidDate` carrying the rejected input.
pub fn parse_date(input: &str) -> RecordResult<NaiveDate> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| RecordError::InvalidDate(trimmed.to_string()))
}

/// Parses a visit time.
///
/// Input files only carry a calendar date, which is stored as midnight on that day.
pub fn parse_visit_time(input: &str) -> RecordResult<NaiveDateTime> {
    parse_date(input).map(|date| date.and_time(NaiveTime::MIN))
}

/// Parses a patient age as a non-negative integer.
pub fn parse_age(input: &str) -> RecordResult<u32> {
    let trimmed = input.trim();
    trimmed.parse::<u32>().map_err(|_| {
        RecordError::InvalidInput(format!("age must be a non-negative integer: {trimmed:?}"))
    })
}
