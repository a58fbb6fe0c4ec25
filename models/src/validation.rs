// models/src/validation.rs

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{ClinicError, ClinicResult};

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date pattern is a valid regex")
});

static TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):([0-5][0-9])$").expect("time pattern is a valid regex")
});

/// Parses a `YYYY-MM-DD` string into a real calendar date. `2024-02-30`
/// matches the shape but is rejected because the day does not exist.
pub fn parse_calendar_date(field: &str, value: &str) -> ClinicResult<NaiveDate> {
    if !DATE_PATTERN.is_match(value) {
        return Err(ClinicError::Validation(format!("{field} must be in YYYY-MM-DD format")));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ClinicError::Validation(format!("{field} is not a valid calendar date")))
}

pub fn is_clock_time(value: &str) -> bool {
    TIME_PATTERN.is_match(value)
}

/// Validates an `HH:mm` wall-clock time between 00:00 and 23:59.
pub fn parse_clock_time(field: &str, value: &str) -> ClinicResult<String> {
    if is_clock_time(value) {
        Ok(value.to_string())
    } else {
        Err(ClinicError::Validation(format!("{field} must be in HH:mm format")))
    }
}

/// Returns the trimmed value, or a validation error naming the missing field.
pub fn required(field: &str, value: Option<&str>) -> ClinicResult<String> {
    crate::identifiers::non_blank(value)
        .ok_or_else(|| ClinicError::Validation(format!("{field} is required")))
}
