//! Timestamp helpers used when stamping events

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a millisecond setting into a `Duration`, treating 0 as "no limit"
pub fn optional_millis(millis: u64) -> Option<Duration> {
    if millis == 0 {
        None
    } else {
        Some(Duration::from_millis(millis))
    }
}
