//! Clock - Pluggable Time Source
//!
//! `TigerStyle`: Explicit time control, no hidden reads of system time.
//!
//! Every store in this crate reads time through a [`Clock`] handle. A
//! [`Clock::system`] handle reads wall time; a [`Clock::manual_at_ms`] handle
//! is an advance-only shared counter that makes decay, TTL expiry, and
//! eviction fully deterministic in tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

use crate::constants::{DST_TIME_ADVANCE_MS_MAX, TIME_MS_PER_SEC};

/// A cloneable time source handle.
///
/// Clones of a manual clock share state: advancing one advances all.
///
/// # Example
/// ```
/// use engram_memory::clock::Clock;
///
/// let clock = Clock::manual_at_ms(1_000);
/// let other = clock.clone();
/// clock.advance_ms(500);
/// assert_eq!(other.now_ms(), 1_500);
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    source: ClockSource,
}

#[derive(Debug, Clone)]
enum ClockSource {
    /// Wall-clock time (milliseconds since Unix epoch, UTC)
    System,
    /// Manually advanced time, shared across clones
    Manual(Arc<AtomicU64>),
}

impl Clock {
    /// Create a clock that reads system time.
    #[must_use]
    pub fn system() -> Self {
        Self {
            source: ClockSource::System,
        }
    }

    /// Create a manual clock starting at time zero.
    #[must_use]
    pub fn manual() -> Self {
        Self::manual_at_ms(0)
    }

    /// Create a manual clock starting at the given millisecond timestamp.
    #[must_use]
    pub fn manual_at_ms(start_ms: u64) -> Self {
        Self {
            source: ClockSource::Manual(Arc::new(AtomicU64::new(start_ms))),
        }
    }

    /// Create a manual clock starting at the given `DateTime`.
    #[must_use]
    pub fn manual_at(dt: DateTime<Utc>) -> Self {
        Self::manual_at_ms(dt.timestamp_millis().max(0) as u64)
    }

    /// Check whether this clock can be advanced manually.
    #[must_use]
    pub fn is_manual(&self) -> bool {
        matches!(self.source, ClockSource::Manual(_))
    }

    /// Get current time in milliseconds since the Unix epoch.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        match &self.source {
            ClockSource::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            ClockSource::Manual(ms) => ms.load(Ordering::SeqCst),
        }
    }

    /// Get current time in whole seconds.
    #[must_use]
    pub fn now_secs(&self) -> u64 {
        self.now_ms() / TIME_MS_PER_SEC
    }

    /// Get current time as `DateTime<Utc>`.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        let ms = self.now_ms() as i64;
        DateTime::from_timestamp_millis(ms)
            .unwrap_or_else(|| DateTime::from_timestamp(0, 0).unwrap_or_default())
    }

    /// Advance a manual clock by the given milliseconds.
    ///
    /// # Panics
    /// Panics if called on a system clock, or if `ms` exceeds
    /// `DST_TIME_ADVANCE_MS_MAX`.
    ///
    /// # Returns
    /// The new current time.
    pub fn advance_ms(&self, ms: u64) -> u64 {
        // Preconditions
        assert!(
            ms <= DST_TIME_ADVANCE_MS_MAX,
            "advance_ms({}) exceeds max ({})",
            ms,
            DST_TIME_ADVANCE_MS_MAX
        );
        let ClockSource::Manual(current) = &self.source else {
            panic!("cannot advance a system clock");
        };

        let old_time = current.fetch_add(ms, Ordering::SeqCst);
        let new_time = old_time.saturating_add(ms);

        // Postcondition
        assert!(new_time >= old_time, "time must not go backwards");

        new_time
    }

    /// Advance a manual clock by the given seconds.
    ///
    /// # Panics
    /// Panics on a system clock or a negative duration.
    pub fn advance_secs(&self, secs: u64) -> u64 {
        self.advance_ms(secs.saturating_mul(TIME_MS_PER_SEC))
    }

    /// Set a manual clock to an absolute time.
    ///
    /// # Panics
    /// Panics if called on a system clock or if `ms` is in the past.
    pub fn set_ms(&self, ms: u64) {
        let ClockSource::Manual(current) = &self.source else {
            panic!("cannot set a system clock");
        };
        let now = current.load(Ordering::SeqCst);
        // Precondition
        assert!(ms >= now, "cannot set time backwards: {} < {}", ms, now);

        current.store(ms, Ordering::SeqCst);
    }

    /// Get elapsed milliseconds since a past timestamp.
    ///
    /// Timestamps from the future yield zero rather than panicking: with a
    /// system clock, an `accessed_at_ms` captured a moment ago can race ahead
    /// of a later `now_ms()` read on platforms with coarse clocks.
    #[must_use]
    pub fn elapsed_since(&self, since_ms: u64) -> u64 {
        self.now_ms().saturating_sub(since_ms)
    }

    /// Check if a deadline (in ms since epoch) has passed.
    #[must_use]
    pub fn is_past_ms(&self, deadline_ms: u64) -> bool {
        self.now_ms() >= deadline_ms
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_starts_at_zero() {
        let clock = Clock::manual();
        assert_eq!(clock.now_ms(), 0);
        assert_eq!(clock.now_secs(), 0);
        assert!(clock.is_manual());
    }

    #[test]
    fn test_manual_at_ms() {
        let clock = Clock::manual_at_ms(5000);
        assert_eq!(clock.now_ms(), 5000);
        assert_eq!(clock.now_secs(), 5);
    }

    #[test]
    fn test_manual_at_datetime() {
        let dt = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .to_utc();
        let clock = Clock::manual_at(dt);
        assert_eq!(clock.now(), dt);
    }

    #[test]
    fn test_advance_ms() {
        let clock = Clock::manual();
        let new_time = clock.advance_ms(1000);
        assert_eq!(new_time, 1000);
        assert_eq!(clock.now_ms(), 1000);
    }

    #[test]
    fn test_advance_secs() {
        let clock = Clock::manual();
        clock.advance_secs(2);
        assert_eq!(clock.now_ms(), 2000);
    }

    #[test]
    fn test_multiple_advances() {
        let clock = Clock::manual();
        clock.advance_ms(100);
        clock.advance_ms(200);
        clock.advance_ms(300);
        assert_eq!(clock.now_ms(), 600);
    }

    #[test]
    #[should_panic(expected = "advance_ms")]
    fn test_advance_exceeds_max() {
        let clock = Clock::manual();
        clock.advance_ms(DST_TIME_ADVANCE_MS_MAX + 1);
    }

    #[test]
    #[should_panic(expected = "cannot advance a system clock")]
    fn test_advance_system_clock() {
        let clock = Clock::system();
        clock.advance_ms(1);
    }

    #[test]
    fn test_set_ms() {
        let clock = Clock::manual();
        clock.set_ms(5000);
        assert_eq!(clock.now_ms(), 5000);
    }

    #[test]
    #[should_panic(expected = "cannot set time backwards")]
    fn test_set_ms_backwards() {
        let clock = Clock::manual();
        clock.advance_ms(1000);
        clock.set_ms(500);
    }

    #[test]
    fn test_elapsed_since() {
        let clock = Clock::manual();
        let start = clock.now_ms();
        clock.advance_ms(500);
        assert_eq!(clock.elapsed_since(start), 500);
    }

    #[test]
    fn test_elapsed_since_future_saturates() {
        let clock = Clock::manual_at_ms(100);
        assert_eq!(clock.elapsed_since(5000), 0);
    }

    #[test]
    fn test_is_past_ms() {
        let clock = Clock::manual_at_ms(1000);
        assert!(clock.is_past_ms(500));
        assert!(clock.is_past_ms(1000));
        assert!(!clock.is_past_ms(1500));
    }

    #[test]
    fn test_clone_shares_time() {
        let clock1 = Clock::manual();
        let clock2 = clock1.clone();

        clock1.advance_ms(1000);

        assert_eq!(clock1.now_ms(), 1000);
        assert_eq!(clock2.now_ms(), 1000);
    }

    #[test]
    fn test_system_clock_is_nonzero() {
        let clock = Clock::system();
        assert!(clock.now_ms() > 0);
        assert!(!clock.is_manual());
    }
}
