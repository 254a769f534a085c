//! Best-effort conversion of raw document attributes into typed values.
//!
//! Library exports are frequently partially populated, so none of these
//! functions fail: an empty or unparsable input yields the type's zero value.

use chrono::NaiveDate;
use std::time::Duration;
use tracing::trace;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The date used when `DateAdded` is missing or unparsable (Unix epoch).
pub fn zero_date() -> NaiveDate {
    NaiveDate::default()
}

pub fn parse_int_or_zero(raw: &str) -> i32 {
    parse_or_default(raw, "integer")
}

pub fn parse_i64_or_zero(raw: &str) -> i64 {
    parse_or_default(raw, "integer")
}

pub fn parse_float_or_zero(raw: &str) -> f64 {
    let value: f64 = parse_or_default(raw, "float");
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

pub fn parse_date_or_zero(raw: &str) -> NaiveDate {
    let raw = raw.trim();
    if raw.is_empty() {
        return zero_date();
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).unwrap_or_else(|_| {
        trace!("Unparsable date {:?}, using zero date", raw);
        zero_date()
    })
}

/// Whole seconds, as used by `TotalTime`.
pub fn parse_duration_or_zero(raw: &str) -> Duration {
    Duration::from_secs(parse_or_default::<u64>(raw, "duration"))
}

fn parse_or_default<T>(raw: &str, kind: &str) -> T
where
    T: std::str::FromStr + Default,
{
    let raw = raw.trim();
    if raw.is_empty() {
        return T::default();
    }
    raw.parse::<T>().unwrap_or_else(|_| {
        trace!("Unparsable {} {:?}, using default", kind, raw);
        T::default()
    })
}
