use core::cmp::Ordering;

use parking_lot::Mutex;

use crate::{
    counter::{CounterError, SequenceCounter},
    id::{SEQUENCE_MASK, TIME_MASK, pack},
    time::TimeSource,
};

#[derive(Clone, Copy, Debug, Default)]
struct State {
    elapsed: u64,
    sequence: u8,
}

/// A lock-based counter suitable for multi-threaded environments.
///
/// State lives behind a [`parking_lot::Mutex`], so callers are served in lock
/// order and identifiers from one counter are strictly increasing.
///
/// When all 256 sequence values of the current unit are used, the counter
/// borrows the next unit and waits for the clock to reach it while still
/// holding the lock. A clock that reads earlier than the stored unit is
/// reported as [`CounterError::ClockMovedBackwards`] and the state is left
/// untouched.
///
/// ## See Also
/// - [`AtomicCounter`]
///
/// [`AtomicCounter`]: crate::AtomicCounter
pub struct LockCounter<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<State>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<State>,
    node_id: u16,
    time: T,
}

impl<T> LockCounter<T>
where
    T: TimeSource,
{
    /// Creates a counter for `node_id` with zeroed time and sequence.
    ///
    /// # Example
    /// ```
    /// use nodeflake::{LockCounter, MonotonicClock, SequenceCounter};
    ///
    /// let counter = LockCounter::new(7, MonotonicClock::new()?);
    /// let id = counter.next_id()?;
    /// assert_eq!(nodeflake::decompose(id)?.node, 7);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(node_id: u16, time: T) -> Self {
        Self::from_components(0, 0, node_id, time)
    }

    /// Creates a counter preloaded with explicit state, e.g. to resume after
    /// the last persisted identifier.
    pub fn from_components(elapsed: u64, sequence: u8, node_id: u16, time: T) -> Self {
        let state = Mutex::new(State { elapsed, sequence });
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(state),
            #[cfg(not(feature = "cache-padded"))]
            state,
            node_id,
            time,
        }
    }

    /// Issues the next identifier.
    ///
    /// # Errors
    ///
    /// - [`CounterError::OverTimeLimit`] once the elapsed time exceeds 39 bits
    /// - [`CounterError::ClockMovedBackwards`] if the clock is behind the
    ///   stored state
    pub fn try_next_id(&self) -> Result<i64, CounterError> {
        let mut state = self.state.lock();
        let now = self.time.current_units();

        let mut borrowed = false;
        match now.cmp(&state.elapsed) {
            Ordering::Greater => {
                state.elapsed = now;
                state.sequence = 0;
            }
            Ordering::Equal => {
                if u64::from(state.sequence) < SEQUENCE_MASK {
                    state.sequence += 1;
                } else {
                    state.elapsed += 1;
                    state.sequence = 0;
                    borrowed = true;
                }
            }
            Ordering::Less => return Err(Self::cold_clock_behind(now, state.elapsed)),
        }

        if state.elapsed > TIME_MASK {
            return Err(CounterError::OverTimeLimit);
        }

        let id = pack(state.elapsed, state.sequence, self.node_id);
        if borrowed {
            self.time.sleep_until(state.elapsed);
        }
        Ok(id)
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: u64, elapsed: u64) -> CounterError {
        CounterError::ClockMovedBackwards {
            behind: elapsed - now,
        }
    }
}

impl<T> SequenceCounter for LockCounter<T>
where
    T: TimeSource,
{
    fn node_id(&self) -> u16 {
        self.node_id
    }

    fn next_id(&self) -> Result<i64, CounterError> {
        self.try_next_id()
    }
}
