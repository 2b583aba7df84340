use std::sync::Arc;

use thiserror::Error;

/// Failures reported by a [`SequenceCounter`].
///
/// [`CounterError::OverTimeLimit`] is fatal. Every other variant is treated as
/// transient by the retrying generator calls.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Error)]
#[non_exhaustive]
pub enum CounterError {
    /// The elapsed time no longer fits in the 39-bit time field.
    #[error("elapsed time is over the 39-bit limit")]
    OverTimeLimit,

    /// The clock reads earlier than the last issued time unit.
    #[error("clock moved backwards by {behind} units")]
    ClockMovedBackwards {
        /// How many units the clock is behind the counter state.
        behind: u64,
    },
}

impl CounterError {
    /// Returns `true` if retrying cannot succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OverTimeLimit)
    }
}

/// A time-partitioned counter that issues packed identifiers for one node.
///
/// Implementations serialize their own state and must be safe to share
/// between threads. [`LockCounter`] and [`AtomicCounter`] are provided; a
/// custom implementation can be wrapped with [`Generator::from_counter`].
///
/// [`LockCounter`]: crate::LockCounter
/// [`AtomicCounter`]: crate::AtomicCounter
/// [`Generator::from_counter`]: crate::Generator::from_counter
pub trait SequenceCounter: Send + Sync {
    /// The node id packed into every identifier.
    fn node_id(&self) -> u16;

    /// Issues the next identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::OverTimeLimit`] once the time field is
    /// exhausted, or a retryable variant when the clock misbehaves.
    fn next_id(&self) -> Result<i64, CounterError>;
}

impl<C> SequenceCounter for Arc<C>
where
    C: SequenceCounter + ?Sized,
{
    fn node_id(&self) -> u16 {
        (**self).node_id()
    }

    fn next_id(&self) -> Result<i64, CounterError> {
        (**self).next_id()
    }
}
