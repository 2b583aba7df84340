use core::time::Duration;

/// Default epoch: Monday, September 1, 2014 00:00:00 UTC
pub const DEFAULT_EPOCH: Duration = Duration::from_millis(1_409_529_600_000);

/// A source of elapsed [`TIME_UNIT`]s since an epoch.
///
/// This abstraction allows you to plug in the real [`MonotonicClock`] or a
/// mocked time source in tests.
///
/// # Example
///
/// ```
/// use nodeflake::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_units(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_units(), 1234);
/// ```
///
/// [`TIME_UNIT`]: crate::TIME_UNIT
/// [`MonotonicClock`]: crate::MonotonicClock
pub trait TimeSource: Send + Sync {
    /// Returns the number of elapsed units since the configured epoch.
    fn current_units(&self) -> u64;

    /// Blocks until [`Self::current_units`] reaches `units`.
    ///
    /// Counters call this after borrowing a future unit. The default does not
    /// wait, which suits mocked clocks that are stepped by hand.
    fn sleep_until(&self, units: u64) {
        let _ = units;
    }
}
