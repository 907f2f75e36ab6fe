use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Calendar breakdown of an event timestamp.
///
/// Every field other than `start_time` is derived from it in UTC, so two
/// marks with the same `start_time` are always equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeMark {
    /// Milliseconds since the Unix epoch.
    pub start_time: i64,
    pub hour: u32,
    pub day: u32,
    /// ISO 8601 week number.
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// ISO 8601 weekday, Monday = 1 through Sunday = 7.
    pub weekday: u32,
}

impl TimeMark {
    /// Derive the calendar parts of a millisecond timestamp.
    ///
    /// Returns `None` when the timestamp is outside chrono's representable
    /// range.
    pub fn from_millis(start_time: i64) -> Option<Self> {
        let dt: DateTime<Utc> = DateTime::from_timestamp_millis(start_time)?;
        Some(Self {
            start_time,
            hour: dt.hour(),
            day: dt.day(),
            week: dt.iso_week().week(),
            month: dt.month(),
            year: dt.year(),
            weekday: dt.weekday().number_from_monday(),
        })
    }
}
