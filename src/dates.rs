//! Lenient ISO 8601 parsing for `dc:date`, `dct:created` and friends.
//!
//! Thesauri in the wild carry anything from full RFC 3339 timestamps to a
//! bare year. Missing parts default to the first day of the period at
//! midnight UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y%m%dT%H%M%S",
];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DateParseError {
    #[error("empty date")]
    Empty,
    #[error("unrecognised ISO 8601 date: {0}")]
    Unrecognised(String),
}

/// Parses an ISO 8601 date or date-time into UTC.
pub fn parse_datetime(text: &str) -> Result<DateTime<Utc>, DateParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DateParseError::Empty);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    // RFC 3339 requires seconds; ISO 8601 allows `2012-03-04T05:06+01:00`.
    if let Ok(parsed) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M%:z") {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(parsed.and_utc());
        }
    }

    parse_date(text)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| DateParseError::Unrecognised(text.to_owned()))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let all_digits = text.bytes().all(|byte| byte.is_ascii_digit());
    match text.len() {
        10 => NaiveDate::parse_from_str(text, "%Y-%m-%d").ok(),
        8 if all_digits => NaiveDate::parse_from_str(text, "%Y%m%d").ok(),
        7 => NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d").ok(),
        4 if all_digits => NaiveDate::parse_from_str(&format!("{text}-01-01"), "%Y-%m-%d").ok(),
        _ => None,
    }
}
