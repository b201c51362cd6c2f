//! Common types and utilities shared across domain models

use std::fmt;

/// Timestamp in milliseconds since Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp for the current moment
    ///
    /// Falls back to timestamp 0 if the system clock reads before UNIX_EPOCH.
    pub fn now() -> Self {
        Self(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_else(|_| std::time::Duration::from_secs(0))
                .as_millis() as i64,
        )
    }

    /// Creates a timestamp from milliseconds since Unix epoch
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since Unix epoch
    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns the timestamp as seconds since Unix epoch
    pub fn as_seconds(&self) -> i64 {
        self.0 / 1000
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Formats a playback offset in seconds as H:MM:SS
///
/// Negative and non-finite inputs render as `0:00:00`.
pub fn format_hms(seconds: f64) -> String {
    let total_seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    format!("{}:{:02}:{:02}", hours, minutes, secs)
}

/// Trait for types that can validate themselves
pub trait Validator {
    /// Validates the instance and returns errors if invalid
    fn validate(&self) -> Result<(), Vec<String>>;

    /// Returns true if the instance is valid
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
