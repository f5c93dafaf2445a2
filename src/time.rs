//! Wall-clock and monotonic time sources.
//!
//! Span timestamps must be wall-clock-plausible while span durations must be
//! computed from a monotonic source, so that a wall clock stepped by NTP (or
//! an operator) between span start and end can never produce a negative or
//! inflated latency. [`AnchoredClock`] provides this guarantee by pairing a
//! single wall-clock reading with a monotonic offset.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant, SystemTime};

/// A source of wall-clock readings and monotonic nanosecond readings.
///
/// Implementations are supplied at provider construction time; every span
/// created by the provider anchors against the clock active at its creation.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current wall-clock time.
    fn wall_time(&self) -> SystemTime;

    /// A monotonic, strictly non-decreasing nanosecond reading.
    ///
    /// The absolute value is meaningless; only deltas between two readings
    /// from the same clock instance are.
    fn monotonic_nanos(&self) -> u64;
}

/// The default [`Clock`], backed by [`SystemTime`] and [`Instant`].
#[derive(Clone, Debug, Default)]
pub struct SystemClock {
    _private: (),
}

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        SystemClock::default()
    }
}

// All `SystemClock` instances share one monotonic epoch so readings stay
// comparable across provider rebuilds within a process.
static MONOTONIC_EPOCH: OnceLock<Instant> = OnceLock::new();

impl Clock for SystemClock {
    fn wall_time(&self) -> SystemTime {
        SystemTime::now()
    }

    fn monotonic_nanos(&self) -> u64 {
        MONOTONIC_EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
    }
}

/// A clock fixed to a single `(wall, monotonic)` anchor.
///
/// `now()` returns the anchor wall time plus the monotonic delta since the
/// anchor was captured. Two `now()` readings therefore differ by exactly the
/// monotonic delta between them, regardless of wall clock adjustments, while
/// the absolute values remain wall-clock-plausible.
#[derive(Clone, Debug)]
pub struct AnchoredClock {
    clock: Arc<dyn Clock>,
    anchor_wall: SystemTime,
    anchor_monotonic: u64,
}

impl AnchoredClock {
    /// Anchor `clock` at its current `(wall, monotonic)` reading.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let anchor_wall = clock.wall_time();
        let anchor_monotonic = clock.monotonic_nanos();
        AnchoredClock {
            clock,
            anchor_wall,
            anchor_monotonic,
        }
    }

    /// The wall time captured when this anchor was created.
    pub fn start_time(&self) -> SystemTime {
        self.anchor_wall
    }

    /// The current time relative to the anchor.
    pub fn now(&self) -> SystemTime {
        let elapsed = self
            .clock
            .monotonic_nanos()
            .saturating_sub(self.anchor_monotonic);
        self.anchor_wall + Duration::from_nanos(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualClock;
    use std::time::UNIX_EPOCH;

    #[test]
    fn anchored_clock_tracks_monotonic_delta() {
        let clock = Arc::new(ManualClock::new(
            UNIX_EPOCH + Duration::from_nanos(1000),
            0,
        ));
        let anchored = AnchoredClock::new(clock.clone() as Arc<dyn Clock>);

        clock.set_monotonic_nanos(500);
        assert_eq!(
            anchored.now(),
            UNIX_EPOCH + Duration::from_nanos(1500),
        );

        // A wall clock jump between readings must not affect `now()`.
        clock.set_wall_time(UNIX_EPOCH + Duration::from_secs(9999));
        clock.set_monotonic_nanos(300);
        assert_eq!(
            anchored.now(),
            UNIX_EPOCH + Duration::from_nanos(1300),
        );
    }

    #[test]
    fn anchored_clock_never_precedes_anchor() {
        let clock = Arc::new(ManualClock::new(
            UNIX_EPOCH + Duration::from_nanos(1000),
            100,
        ));
        let anchored = AnchoredClock::new(clock.clone() as Arc<dyn Clock>);

        // Monotonic readings below the anchor saturate to the anchor itself.
        clock.set_monotonic_nanos(0);
        assert_eq!(anchored.now(), anchored.start_time());
    }

    #[test]
    fn system_clock_monotonic_nanos_is_nondecreasing() {
        let clock = SystemClock::new();
        let first = clock.monotonic_nanos();
        let second = clock.monotonic_nanos();
        assert!(second >= first);
    }
}
