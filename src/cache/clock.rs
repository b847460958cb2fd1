//! Millisecond wall-clock helper.
//!
//! The cache itself never schedules anything; timestamps are plain u64
//! Unix milliseconds so tests can drive a logical clock instead.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
