//! Shared primitive types and the wire encodings used by every table.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serializer;

/// A merchant identifier, 1-based in generation order.
pub type MerchantId = u32;

/// A per-table surrogate key, 1-based and monotonically increasing.
pub type RowId = u64;

/// Whole days since a merchant's install date.
pub type DayOffset = u32;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn serialize_timestamp<S: Serializer>(
    ts: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(ts))
}

pub(crate) fn serialize_date<S: Serializer>(
    date: &NaiveDate,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_date(date))
}

/// Combine a calendar date with a wall-clock time (seconds are always zero).
pub fn at_time(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour.min(23), minute.min(59), 0)
        .unwrap_or_else(|| date.and_time(NaiveTime::default()))
}
