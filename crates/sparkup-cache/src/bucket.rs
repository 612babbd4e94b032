//! Wall-clock quantization for cache keys.

use chrono::{DateTime, Timelike, Utc};

/// A fixed-size window of wall-clock time.
///
/// The window start is the current time truncated to the minute, minus
/// `minute_of_hour % interval` minutes. Two instants in the same window
/// produce equal buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeBucket(i64);

impl TimeBucket {
    /// The bucket containing `now`.
    pub fn current(interval_minutes: u32) -> Self {
        Self::at(Utc::now(), interval_minutes)
    }

    /// The bucket containing `instant`.
    pub fn at(instant: DateTime<Utc>, interval_minutes: u32) -> Self {
        let interval = interval_minutes.max(1);
        let secs = instant.timestamp();
        let into_minute = secs.rem_euclid(60);
        let minute_offset = i64::from(instant.minute() % interval);
        Self(secs - into_minute - minute_offset * 60)
    }

    /// Unix seconds of the window start; used as the cache key.
    pub fn key(self) -> i64 {
        self.0
    }

    /// Window start as a timestamp.
    pub fn starts_at(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.0, 0)
    }
}
