//! Time-related utilities with clock abstraction for testability.
//!
//! Message timestamps travel as RFC 3339 strings in UTC with millisecond
//! precision. Keeping the format fixed makes lexicographic comparison of two
//! timestamps equivalent to chronological comparison.

use chrono::{SecondsFormat, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Current time as an RFC 3339 string (UTC, millisecond precision)
    fn now_rfc3339(&self) -> String;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        now_utc_rfc3339()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone)]
pub struct FixedClock {
    fixed_time: String,
}

impl FixedClock {
    /// Create a new fixed clock with the given RFC 3339 timestamp
    pub fn new(fixed_time: impl Into<String>) -> Self {
        Self {
            fixed_time: fixed_time.into(),
        }
    }
}

impl Clock for FixedClock {
    fn now_rfc3339(&self) -> String {
        self.fixed_time.clone()
    }
}

/// Current UTC time as an RFC 3339 string with millisecond precision
pub fn now_utc_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
