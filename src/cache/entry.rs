//! Cache Entry Module
//!
//! Defines the persisted metadata for one cache key and the expiration
//! options callers pass to `set`.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

// == Entry Options ==
/// Expiration policy supplied with a `set` call.
///
/// Precedence when several are set: absolute timestamp, then duration
/// relative to now, then sliding window. Lower-ranked options are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryOptions {
    pub absolute_expiration: Option<DateTime<Utc>>,
    pub absolute_expiration_relative_to_now: Option<Duration>,
    pub sliding_expiration: Option<Duration>,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expires at a fixed point in time.
    pub fn absolute(at: DateTime<Utc>) -> Self {
        Self::new().with_absolute_expiration(at)
    }

    /// Expires a fixed duration after the write.
    pub fn relative(ttl: Duration) -> Self {
        Self::new().with_relative_expiration(ttl)
    }

    /// Expires `window` after the write, extended by each refresh.
    ///
    /// The window is kept in whole seconds, rounded up: 1.5s slides by 2s.
    pub fn sliding(window: Duration) -> Self {
        Self::new().with_sliding_expiration(window)
    }

    pub fn with_absolute_expiration(mut self, at: DateTime<Utc>) -> Self {
        self.absolute_expiration = Some(at);
        self
    }

    pub fn with_relative_expiration(mut self, ttl: Duration) -> Self {
        self.absolute_expiration_relative_to_now = Some(ttl);
        self
    }

    pub fn with_sliding_expiration(mut self, window: Duration) -> Self {
        self.sliding_expiration = Some(window);
        self
    }
}

// == Entry Record ==
/// Metadata stored next to each payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Instant after which the entry is gone
    pub expire_at: DateTime<Utc>,
    /// Last sliding extension (informational)
    pub last_refreshed_at: DateTime<Utc>,
    /// Ceiling a sliding extension may never pass
    pub absolute_expire_at: Option<DateTime<Utc>>,
    /// Sliding window in seconds, 0 = not sliding
    pub sliding_seconds: u64,
}

impl EntryRecord {
    // == Constructor ==
    /// Builds the record for a write happening at `now`.
    ///
    /// # Arguments
    /// * `options` - Expiration options supplied by the caller
    /// * `now` - Time of the write
    /// * `default_ttl` - Lifetime used when `options` sets nothing
    pub fn from_options(options: &EntryOptions, now: DateTime<Utc>, default_ttl: Duration) -> Self {
        let (expire_at, absolute_expire_at, sliding_seconds) = match (
            options.absolute_expiration,
            options.absolute_expiration_relative_to_now,
            options.sliding_expiration,
        ) {
            (Some(at), _, _) => (at, Some(at), 0),
            (None, Some(ttl), _) => (add_duration(now, ttl), None, 0),
            (None, None, Some(window)) => {
                let secs = sliding_secs(window);
                (add_duration(now, Duration::from_secs(secs)), None, secs)
            }
            (None, None, None) => (add_duration(now, default_ttl), None, 0),
        };

        Self {
            expire_at,
            last_refreshed_at: now,
            absolute_expire_at,
            sliding_seconds,
        }
    }

    // == Is Expired ==
    /// Returns true once `now` is strictly past `expire_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expire_at
    }

    pub fn is_sliding(&self) -> bool {
        self.sliding_seconds > 0
    }

    // == Refresh ==
    /// Extends a live sliding entry from `now`, clamped to its ceiling.
    ///
    /// Returns false and leaves the record untouched when the entry is not
    /// sliding or already expired. Expiry never moves backwards.
    pub fn refreshed_at(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_sliding() || self.is_expired_at(now) {
            return false;
        }

        let mut candidate = i64::try_from(self.sliding_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|window| now.checked_add_signed(window))
            .map_or_else(far_future, |at| at.min(far_future()));
        if let Some(ceiling) = self.absolute_expire_at {
            candidate = candidate.min(ceiling);
        }

        self.last_refreshed_at = now;
        self.expire_at = self.expire_at.max(candidate);
        true
    }
}

// == Utility Functions ==
/// Latest timestamp kept on disk (9999-12-31T23:59:59Z); later years do not
/// survive an RFC 3339 round trip.
fn far_future() -> DateTime<Utc> {
    DateTime::from_timestamp(253_402_300_799, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Adds a std duration to a timestamp, saturating at the far future.
fn add_duration(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .map_or_else(far_future, |end| end.min(far_future()))
}

/// Whole seconds of a sliding window; a non-zero window never rounds to 0.
fn sliding_secs(window: Duration) -> u64 {
    match window.as_secs() {
        0 if !window.is_zero() => 1,
        secs if window.subsec_nanos() > 0 => secs + 1,
        secs => secs,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: Duration = Duration::from_secs(300);

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_no_options_uses_default_ttl() {
        let record = EntryRecord::from_options(&EntryOptions::new(), at(0), DEFAULT);

        assert_eq!(record.expire_at, at(300));
        assert_eq!(record.last_refreshed_at, at(0));
        assert!(record.absolute_expire_at.is_none());
        assert_eq!(record.sliding_seconds, 0);
    }

    #[test]
    fn test_absolute_sets_ceiling() {
        let record = EntryRecord::from_options(&EntryOptions::absolute(at(10)), at(0), DEFAULT);

        assert_eq!(record.expire_at, at(10));
        assert_eq!(record.absolute_expire_at, Some(at(10)));
        assert!(!record.is_sliding());
    }

    #[test]
    fn test_relative_from_now() {
        let record = EntryRecord::from_options(
            &EntryOptions::relative(Duration::from_secs(60)),
            at(0),
            DEFAULT,
        );

        assert_eq!(record.expire_at, at(60));
        assert!(record.absolute_expire_at.is_none());
        assert_eq!(record.sliding_seconds, 0);
    }

    #[test]
    fn test_absolute_wins_over_relative() {
        let options = EntryOptions::absolute(at(10)).with_relative_expiration(Duration::from_secs(60));
        let record = EntryRecord::from_options(&options, at(0), DEFAULT);

        assert_eq!(record.expire_at, at(10));
    }

    #[test]
    fn test_sliding_records_window() {
        let record =
            EntryRecord::from_options(&EntryOptions::sliding(Duration::from_secs(2)), at(0), DEFAULT);

        assert_eq!(record.expire_at, at(2));
        assert_eq!(record.sliding_seconds, 2);
        assert!(record.absolute_expire_at.is_none());
    }

    #[test]
    fn test_absolute_wins_over_sliding() {
        let options = EntryOptions::sliding(Duration::from_secs(1)).with_absolute_expiration(at(10));
        let record = EntryRecord::from_options(&options, at(0), DEFAULT);

        assert_eq!(record.expire_at, at(10));
        assert_eq!(record.absolute_expire_at, Some(at(10)));
        assert_eq!(record.sliding_seconds, 0, "Sliding is ignored next to an absolute bound");
    }

    #[test]
    fn test_relative_wins_over_sliding() {
        let options =
            EntryOptions::sliding(Duration::from_secs(1)).with_relative_expiration(Duration::from_secs(10));
        let record = EntryRecord::from_options(&options, at(0), DEFAULT);

        assert_eq!(record.expire_at, at(10));
        assert!(record.absolute_expire_at.is_none());
        assert_eq!(record.sliding_seconds, 0);
    }

    #[test]
    fn test_fractional_sliding_window_rounds_initial_expiry() {
        let start = at(0);
        let record =
            EntryRecord::from_options(&EntryOptions::sliding(Duration::from_millis(1500)), start, DEFAULT);

        assert_eq!(record.sliding_seconds, 2);
        assert_eq!(record.expire_at, at(2), "Initial expiry uses the same window as refreshes");
    }

    #[test]
    fn test_subsecond_sliding_rounds_up() {
        assert_eq!(sliding_secs(Duration::from_millis(200)), 1);
        assert_eq!(sliding_secs(Duration::from_millis(1500)), 2);
        assert_eq!(sliding_secs(Duration::from_secs(3)), 3);
        assert_eq!(sliding_secs(Duration::ZERO), 0);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let record = EntryRecord::from_options(&EntryOptions::absolute(at(10)), at(0), DEFAULT);

        assert!(!record.is_expired_at(at(9)));
        assert!(!record.is_expired_at(at(10)), "Entry is still present at its deadline");
        assert!(record.is_expired_at(at(11)));
    }

    #[test]
    fn test_refresh_extends_sliding_entry() {
        let mut record =
            EntryRecord::from_options(&EntryOptions::sliding(Duration::from_secs(2)), at(0), DEFAULT);

        assert!(record.refreshed_at(at(1)));
        assert_eq!(record.expire_at, at(3));
        assert_eq!(record.last_refreshed_at, at(1));
    }

    #[test]
    fn test_refresh_clamped_to_ceiling() {
        let mut record = EntryRecord {
            expire_at: at(4),
            last_refreshed_at: at(0),
            absolute_expire_at: Some(at(6)),
            sliding_seconds: 4,
        };

        assert!(record.refreshed_at(at(3)));
        assert_eq!(record.expire_at, at(6));
        assert!(record.refreshed_at(at(5)));
        assert_eq!(record.expire_at, at(6), "Refresh must never pass the ceiling");
    }

    #[test]
    fn test_refresh_ignores_absolute_entry() {
        let mut record = EntryRecord::from_options(&EntryOptions::absolute(at(10)), at(0), DEFAULT);
        let before = record.clone();

        assert!(!record.refreshed_at(at(5)));
        assert_eq!(record, before);
    }

    #[test]
    fn test_refresh_does_not_revive_expired_entry() {
        let mut record =
            EntryRecord::from_options(&EntryOptions::sliding(Duration::from_secs(2)), at(0), DEFAULT);

        assert!(!record.refreshed_at(at(5)));
        assert_eq!(record.expire_at, at(2));
    }

    #[test]
    fn test_stale_refresh_never_moves_expiry_back() {
        let mut record =
            EntryRecord::from_options(&EntryOptions::sliding(Duration::from_secs(10)), at(0), DEFAULT);
        record.refreshed_at(at(8));
        assert_eq!(record.expire_at, at(18));

        // An older timestamp arriving late keeps the later deadline
        record.refreshed_at(at(4));
        assert_eq!(record.expire_at, at(18));
    }

    #[test]
    fn test_huge_duration_saturates() {
        let record = EntryRecord::from_options(&EntryOptions::relative(Duration::MAX), at(0), DEFAULT);
        assert_eq!(record.expire_at, far_future());

        let json = serde_json::to_string(&record).unwrap();
        let parsed: EntryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_record_json_shape() {
        let record =
            EntryRecord::from_options(&EntryOptions::sliding(Duration::from_secs(2)), at(0), DEFAULT);
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.contains("\"expire_at\""));
        assert!(json.contains("\"sliding_seconds\":2"));
        assert!(json.contains("\"absolute_expire_at\":null"));
        let parsed: EntryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
