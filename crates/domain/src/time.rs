//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for notification times, snapshots and dedup windows.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Convert a vendor millisecond epoch into a [`Timestamp`].
///
/// Out-of-range values fall back to the current time so that a corrupt
/// hardware clock never drops a notification on its own.
#[must_use]
pub fn from_millis(millis: i64) -> Timestamp {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(now)
}

/// Serde adapter writing timestamps as `YYYY-mm-dd HH:MM:SS`.
pub mod seconds_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Timestamp;

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Serialize a timestamp with second precision.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(FORMAT))
    }

    /// Parse a timestamp written by [`serialize`].
    ///
    /// # Errors
    ///
    /// Returns a deserializer error when the string does not match the format.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
