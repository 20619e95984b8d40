//! Time helpers
//!
//! Repository rows store `i64` Unix seconds; all conversion happens
//! here so engines never touch `chrono` directly.

/// Current Unix timestamp in seconds
pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Current Unix timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
