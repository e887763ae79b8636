//! # Timestamp Value Object
//!
//! UTC point in time used for quote production times, snapshot ages and
//! persistence retention.
//!
//! # Examples
//!
//! ```
//! use remit_quotes::domain::value_objects::timestamp::Timestamp;
//!
//! let now = Timestamp::now();
//! let earlier = now.sub_secs(60);
//!
//! assert!(earlier.is_before(&now));
//! ```

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A UTC timestamp.
///
/// Wraps `chrono::DateTime<Utc>`. Serializes transparently as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from Unix milliseconds.
    ///
    /// Returns `None` if the value is out of range.
    ///
    /// ```
    /// use remit_quotes::domain::value_objects::timestamp::Timestamp;
    ///
    /// let ts = Timestamp::from_millis(1704067200000).unwrap();
    /// assert_eq!(ts.timestamp_millis(), 1704067200000);
    /// ```
    #[must_use]
    pub fn from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    /// Returns the Unix timestamp in milliseconds.
    #[inline]
    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Returns a new timestamp `secs` seconds later.
    #[must_use]
    pub fn add_secs(&self, secs: i64) -> Self {
        Self(self.0 + Duration::seconds(secs))
    }

    /// Returns a new timestamp `secs` seconds earlier.
    #[must_use]
    pub fn sub_secs(&self, secs: i64) -> Self {
        Self(self.0 - Duration::seconds(secs))
    }

    /// Returns a new timestamp `duration` earlier, saturating on overflow.
    #[must_use]
    pub fn sub_duration(&self, duration: std::time::Duration) -> Self {
        Duration::from_std(duration)
            .ok()
            .and_then(|d| self.0.checked_sub_signed(d))
            .map_or(*self, Self)
    }

    /// Returns true if this timestamp is strictly before `other`.
    #[inline]
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self.0 < other.0
    }

    /// Returns the age of this timestamp relative to now.
    ///
    /// Future timestamps have an age of zero.
    #[must_use]
    pub fn age(&self) -> std::time::Duration {
        (Utc::now() - self.0).to_std().unwrap_or_default()
    }

    /// Returns the wall-clock duration until the next occurrence of `time` (UTC).
    ///
    /// If `time` is exactly now the result is a full day.
    #[must_use]
    pub fn until_next_daily(&self, time: NaiveTime) -> std::time::Duration {
        let today = self.0.date_naive().and_time(time).and_utc();
        let next = if today > self.0 {
            today
        } else {
            today + Duration::days(1)
        };
        (next - self.0).to_std().unwrap_or_default()
    }

    /// Returns the underlying `DateTime<Utc>`.
    #[inline]
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn from_millis_roundtrip() {
        let ts = Timestamp::from_millis(1_704_067_200_000).unwrap();
        assert_eq!(ts.timestamp_millis(), 1_704_067_200_000);
    }

    #[test]
    fn add_and_sub_secs() {
        let ts = Timestamp::from_millis(1_704_067_200_000).unwrap();
        assert_eq!(ts.add_secs(60).timestamp_millis(), 1_704_067_260_000);
        assert_eq!(ts.sub_secs(60).timestamp_millis(), 1_704_067_140_000);
    }

    #[test]
    fn sub_duration() {
        let ts = Timestamp::from_millis(1_704_067_200_000).unwrap();
        let earlier = ts.sub_duration(std::time::Duration::from_secs(3600));
        assert_eq!(earlier.timestamp_millis(), 1_704_063_600_000);
    }

    #[test]
    fn ordering() {
        let a = Timestamp::from_millis(1000).unwrap();
        let b = Timestamp::from_millis(2000).unwrap();
        assert!(a.is_before(&b));
        assert!(!b.is_before(&a));
        assert!(a < b);
    }

    #[test]
    fn age_of_future_timestamp_is_zero() {
        let future = Timestamp::now().add_secs(120);
        assert_eq!(future.age(), std::time::Duration::ZERO);
    }

    #[test]
    fn until_next_daily_later_today() {
        // 2024-01-01T00:00:00Z
        let ts = Timestamp::from_millis(1_704_067_200_000).unwrap();
        let three_am = NaiveTime::from_hms_opt(3, 0, 0).unwrap();
        assert_eq!(
            ts.until_next_daily(three_am),
            std::time::Duration::from_secs(3 * 3600)
        );
    }

    #[test]
    fn until_next_daily_rolls_over() {
        // 2024-01-01T04:00:00Z
        let ts = Timestamp::from_millis(1_704_081_600_000).unwrap();
        let three_am = NaiveTime::from_hms_opt(3, 0, 0).unwrap();
        assert_eq!(
            ts.until_next_daily(three_am),
            std::time::Duration::from_secs(23 * 3600)
        );
    }

    #[test]
    fn serde_is_transparent() {
        let ts = Timestamp::from_millis(1_704_067_200_000).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.contains("2024-01-01T00:00:00"));
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
