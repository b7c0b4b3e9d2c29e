//! Time utilities for pushupd
//!
//! Provides monotonic time (for session elapsed-time checks that must not be
//! affected by wall-clock changes) and the wall-clock formatting used by the
//! violation table.

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

/// `date_paid` value meaning "not yet paid"
pub const UNPAID_SENTINEL: &str = "0000-00-00 00:00:00";

/// Timestamp format used by the `violation` table
pub const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Get the current local time.
#[allow(clippy::disallowed_methods)] // The single place that reads the wall clock
pub fn now() -> DateTime<Local> {
    chrono::Local::now()
}

/// Format a wall-clock time the way the `violation` table stores it
pub fn format_db_timestamp(dt: &DateTime<Local>) -> String {
    dt.format(DB_TIMESTAMP_FORMAT).to_string()
}

/// Whether a `date_paid` value means the violation has been paid
pub fn is_paid_timestamp(date_paid: &str) -> bool {
    let trimmed = date_paid.trim();
    !trimmed.is_empty() && trimmed != UNPAID_SENTINEL
}

/// Represents a point in monotonic time.
/// This is immune to wall-clock changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonotonicInstant(Instant);

impl MonotonicInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    /// Duration since `earlier`, or zero if `earlier` is later than `self`
    pub fn duration_since(&self, earlier: MonotonicInstant) -> Duration {
        self.0.saturating_duration_since(earlier.0)
    }
}

impl std::ops::Add<Duration> for MonotonicInstant {
    type Output = MonotonicInstant;

    fn add(self, rhs: Duration) -> Self::Output {
        MonotonicInstant(self.0 + rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_monotonic_instant() {
        let t1 = MonotonicInstant::now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = MonotonicInstant::now();

        assert!(t2 > t1);
        assert!(t2.duration_since(t1) >= Duration::from_millis(10));
    }

    #[test]
    fn duration_since_saturates() {
        let t1 = MonotonicInstant::now();
        let t2 = t1 + Duration::from_secs(3);
        assert_eq!(t1.duration_since(t2), Duration::ZERO);
        assert_eq!(t2.duration_since(t1), Duration::from_secs(3));
    }

    #[test]
    fn test_format_db_timestamp() {
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        assert_eq!(format_db_timestamp(&dt), "2025-12-25 14:30:45");
    }

    #[test]
    fn sentinel_is_unpaid() {
        assert!(!is_paid_timestamp(UNPAID_SENTINEL));
        assert!(!is_paid_timestamp(""));
        assert!(is_paid_timestamp("2025-01-02 03:04:05"));
    }
}
