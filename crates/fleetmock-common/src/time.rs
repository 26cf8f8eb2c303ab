// ============================================
// File: crates/fleetmock-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! Unix timestamps stamped onto stored log records and probe reports.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ============================================
// Timestamp
// ============================================

/// Unix timestamp in seconds.
///
/// # Example
/// ```
/// use fleetmock_common::time::Timestamp;
///
/// let now = Timestamp::now();
/// assert!(now.as_secs() > 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp for the current time.
    ///
    /// A clock set before the Unix epoch yields `0`.
    #[must_use]
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self(secs)
    }

    /// Returns the Unix timestamp in seconds.
    #[must_use]
    pub const fn as_secs(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_now_is_after_2020() {
        assert!(Timestamp::now().as_secs() > 1_577_836_800);
    }

    #[test]
    fn test_timestamp_serde_transparent() {
        let ts = Timestamp(42);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "42");
    }
}
