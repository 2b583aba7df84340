use core::time::Duration;
use std::{
    thread,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use crate::{DEFAULT_EPOCH, Error, Result, TIME_UNIT, TimeSource};

const UNIT_NANOS: u128 = TIME_UNIT.as_nanos();

/// A monotonic time source that returns elapsed time since process start,
/// offset from a user-defined epoch.
///
/// This avoids wall-clock adjustments (e.g., NTP steps) while still aligning
/// timestamps to a fixed origin: the wall clock is read once at construction
/// to compute the offset from the epoch, and every later reading adds the
/// [`Instant`] elapsed since then.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
    epoch_offset: Duration,
}

impl MonotonicClock {
    /// Constructs a clock aligned to [`DEFAULT_EPOCH`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the system clock is earlier than
    /// the epoch.
    pub fn new() -> Result<Self> {
        Self::with_epoch(DEFAULT_EPOCH)
    }

    /// Constructs a clock using `epoch`, a [`Duration`] since 1970-01-01 UTC,
    /// as the origin (t = 0).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the system clock is earlier than
    /// the Unix epoch or than `epoch`.
    ///
    /// ```
    /// use nodeflake::{MonotonicClock, TimeSource};
    /// use std::time::{Duration, SystemTime, UNIX_EPOCH};
    ///
    /// let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
    /// let clock = MonotonicClock::with_epoch(now - Duration::from_secs(1))?;
    /// assert!(clock.current_units() >= 100);
    /// # Ok::<(), nodeflake::Error>(())
    /// ```
    pub fn with_epoch(epoch: Duration) -> Result<Self> {
        let start = Instant::now();
        let system_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| Error::invalid_config("system clock is before the Unix epoch"))?;
        let epoch_offset = system_now
            .checked_sub(epoch)
            .ok_or_else(|| Error::invalid_config("epoch is ahead of the system clock"))?;
        Ok(Self {
            start,
            epoch_offset,
        })
    }

    fn since_epoch(&self) -> Duration {
        self.epoch_offset + self.start.elapsed()
    }
}

impl TimeSource for MonotonicClock {
    fn current_units(&self) -> u64 {
        (self.since_epoch().as_nanos() / UNIT_NANOS) as u64
    }

    fn sleep_until(&self, units: u64) {
        let target = Duration::from_nanos(units.saturating_mul(UNIT_NANOS as u64));
        let now = self.since_epoch();
        if target > now {
            thread::sleep(target - now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_epoch_in_the_future() {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
        let err = MonotonicClock::with_epoch(now + Duration::from_secs(3600)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn counts_units_from_epoch() {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
        let clock = MonotonicClock::with_epoch(now - Duration::from_secs(10)).unwrap();
        let units = clock.current_units();
        assert!((1000..1100).contains(&units), "got {units}");
    }

    #[test]
    fn sleep_until_reaches_target_unit() {
        let clock = MonotonicClock::new().unwrap();
        let target = clock.current_units() + 2;
        clock.sleep_until(target);
        assert!(clock.current_units() >= target);
    }

    #[test]
    fn never_goes_backward() {
        let clock = MonotonicClock::new().unwrap();
        let mut last = clock.current_units();
        for _ in 0..10_000 {
            let next = clock.current_units();
            assert!(next >= last);
            last = next;
        }
    }
}
