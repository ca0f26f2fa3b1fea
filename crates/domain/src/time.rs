//! Time and timestamp helpers.
//!
//! Timestamps are UTC internally and stored as Unix milliseconds; the RPC
//! wire uses Unix seconds.

use chrono::{DateTime, TimeZone, Utc};

/// UTC timestamp used for sample boundaries, live-log entries and events.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Convert a timestamp to the Unix-millisecond storage representation.
#[must_use]
pub fn to_millis(ts: Timestamp) -> i64 {
    ts.timestamp_millis()
}

/// Build a timestamp from the Unix-millisecond storage representation.
#[must_use]
pub fn from_millis(millis: i64) -> Option<Timestamp> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Convert a timestamp to Unix seconds for the RPC wire.
#[must_use]
pub fn to_unix_seconds(ts: Timestamp) -> i64 {
    ts.timestamp()
}

/// Build a timestamp from Unix seconds received on the RPC wire.
#[must_use]
pub fn from_unix_seconds(secs: i64) -> Option<Timestamp> {
    Utc.timestamp_opt(secs, 0).single()
}
