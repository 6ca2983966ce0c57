//! Precise time differences.
//!
//! Durations are kept as fixed-point decimals with 5 fractional digits of a
//! second (10 µs ticks) so that multiplying by 1000 for millisecond display
//! never accumulates floating-point drift. Conversion truncates: a sum of
//! truncated parts never exceeds the truncated whole.

use std::fmt;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Ticks per second (5 fractional digits).
pub const TICKS_PER_SECOND: u64 = 100_000;

const NANOS_PER_TICK: u128 = 10_000;
const TICKS_PER_MINUTE: u64 = 60 * TICKS_PER_SECOND;
const TICKS_PER_HOUR: u64 = 60 * TICKS_PER_MINUTE;

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// Capture the process start timestamp. Only the first call has an effect;
/// call it as early as possible in `main`.
pub fn mark_process_start() -> Instant {
    *PROCESS_START.get_or_init(Instant::now)
}

/// The process start timestamp (captured on first use if never marked).
pub fn process_start() -> Instant {
    mark_process_start()
}

/// An elapsed time in 10 µs ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Elapsed {
    ticks: u64,
}

impl Elapsed {
    pub const ZERO: Elapsed = Elapsed { ticks: 0 };

    /// Truncate a duration to whole ticks.
    pub fn from_duration(duration: Duration) -> Self {
        let ticks = duration.as_nanos() / NANOS_PER_TICK;
        Self {
            ticks: u64::try_from(ticks).unwrap_or(u64::MAX),
        }
    }

    /// Reassemble from hours, minutes and second ticks.
    pub fn from_hms(hours: u64, minutes: u64, second_ticks: u64) -> Self {
        Self {
            ticks: hours * TICKS_PER_HOUR + minutes * TICKS_PER_MINUTE + second_ticks,
        }
    }

    /// Split into (hours, minutes, second ticks).
    pub fn hms(&self) -> (u64, u64, u64) {
        let hours = self.ticks / TICKS_PER_HOUR;
        let minutes = (self.ticks % TICKS_PER_HOUR) / TICKS_PER_MINUTE;
        let second_ticks = self.ticks % TICKS_PER_MINUTE;
        (hours, minutes, second_ticks)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn as_millis(&self) -> f64 {
        self.ticks as f64 / (TICKS_PER_SECOND / 1000) as f64
    }

    pub fn saturating_sub(self, other: Elapsed) -> Elapsed {
        Elapsed {
            ticks: self.ticks.saturating_sub(other.ticks),
        }
    }
}

impl fmt::Display for Elapsed {
    /// Seconds with exactly 5 fractional digits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:05}",
            self.ticks / TICKS_PER_SECOND,
            self.ticks % TICKS_PER_SECOND
        )
    }
}

/// Elapsed time between `start` and `now`, decomposed into hours, minutes
/// and seconds and reassembled as a fixed-point value. `now` before `start`
/// gives zero.
pub fn elapsed_between(start: Instant, now: Instant) -> Elapsed {
    let raw = Elapsed::from_duration(now.saturating_duration_since(start));
    let (hours, minutes, second_ticks) = raw.hms();
    Elapsed::from_hms(hours, minutes, second_ticks)
}

/// Elapsed time since `start`.
pub fn elapsed_since(start: Instant) -> Elapsed {
    elapsed_between(start, Instant::now())
}
