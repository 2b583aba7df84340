use core::cmp;

use portable_atomic::{AtomicU64, Ordering};

use crate::{
    counter::{CounterError, SequenceCounter},
    id::{SEQUENCE_BITS, SEQUENCE_MASK, TIME_MASK, pack},
    time::TimeSource,
};

/// A lock-free counter suitable for multi-threaded environments.
///
/// The elapsed time and sequence are packed into one [`AtomicU64`] and
/// advanced with compare-and-swap, so threads never block each other. A
/// thread that loses the race retries immediately.
///
/// When the sequence of the current unit is exhausted the caller waits in
/// [`TimeSource::sleep_until`] for the next unit instead of borrowing it, so
/// the clock must actually advance.
///
/// ## See Also
/// - [`LockCounter`]
///
/// [`LockCounter`]: crate::LockCounter
pub struct AtomicCounter<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU64,
    node_id: u16,
    time: T,
}

impl<T> AtomicCounter<T>
where
    T: TimeSource,
{
    /// Creates a counter for `node_id` with zeroed time and sequence.
    pub fn new(node_id: u16, time: T) -> Self {
        Self::from_components(0, 0, node_id, time)
    }

    /// Creates a counter preloaded with explicit state.
    pub fn from_components(elapsed: u64, sequence: u8, node_id: u16, time: T) -> Self {
        let state = AtomicU64::new(Self::pack_state(elapsed, sequence));
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
        loop {
            let now = self.time.current_units();
            let current = self.state.load(Ordering::Acquire);
            let (elapsed, sequence) = Self::unpack_state(current);

            let (next_elapsed, next_sequence) = match now.cmp(&elapsed) {
                cmp::Ordering::Greater => (now, 0),
                cmp::Ordering::Equal if u64::from(sequence) < SEQUENCE_MASK => {
                    (elapsed, sequence + 1)
                }
                cmp::Ordering::Equal => {
                    self.time.sleep_until(elapsed + 1);
                    continue;
                }
                cmp::Ordering::Less => {
                    return Err(CounterError::ClockMovedBackwards {
                        behind: elapsed - now,
                    });
                }
            };

            if next_elapsed > TIME_MASK {
                return Err(CounterError::OverTimeLimit);
            }

            let next = Self::pack_state(next_elapsed, next_sequence);
            if self
                .state
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(pack(next_elapsed, next_sequence, self.node_id));
            }
            // another thread won the race
            core::hint::spin_loop();
        }
    }

    const fn pack_state(elapsed: u64, sequence: u8) -> u64 {
        (elapsed << SEQUENCE_BITS) | sequence as u64
    }

    const fn unpack_state(raw: u64) -> (u64, u8) {
        (raw >> SEQUENCE_BITS, (raw & SEQUENCE_MASK) as u8)
    }
}

impl<T> SequenceCounter for AtomicCounter<T>
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
