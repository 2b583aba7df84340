use core::time::Duration;

use thiserror::Error;

use crate::{counter::CounterError, node::AddressError};

/// A result type defaulting to this crate's [`enum@Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors `nodeflake` can produce.
///
/// Variants fall into a few classes:
/// - configuration: [`Error::InvalidConfig`], [`Error::InvalidNodeId`],
///   [`Error::NodeIdRejected`], [`Error::NodeUnresolved`]
/// - fatal generation: [`Error::TimeOverflow`]
/// - retryable generation: [`Error::Counter`], which the retrying calls turn
///   into [`Error::ClockBackwardTimeout`] once their budget is spent
/// - caller control: [`Error::Cancelled`], [`Error::DeadlineExceeded`]
/// - usage: [`Error::NilGenerator`], [`Error::InvalidIdentifier`],
///   [`Error::NotInitialized`], [`Error::AlreadyInitialized`]
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The value is not a valid identifier: non-positive, malformed text, or
    /// out of the 63-bit layout.
    #[error("invalid identifier {input:?}: {reason}")]
    InvalidIdentifier {
        input: String,
        reason: &'static str,
    },

    /// A method was called on a default (unconfigured) [`Generator`].
    ///
    /// [`Generator`]: crate::Generator
    #[error("generator is not configured")]
    NilGenerator,

    /// The 39-bit time field has exhausted its range for this epoch. This is
    /// never retried.
    #[error("time field overflowed its 39-bit range")]
    TimeOverflow,

    /// A single generation attempt failed with a retryable counter error.
    #[error("generation attempt failed: {0}")]
    Counter(#[from] CounterError),

    /// The retry budget ran out before the counter recovered. `waited` is
    /// the time measured from the first failed attempt, at least the
    /// configured max wait.
    #[error("counter did not recover within {waited:?}")]
    ClockBackwardTimeout {
        waited: Duration,
        #[source]
        source: CounterError,
    },

    /// The caller's [`CancelToken`] was cancelled.
    ///
    /// [`CancelToken`]: crate::CancelToken
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's [`CancelToken`] deadline passed.
    ///
    /// [`CancelToken`]: crate::CancelToken
    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// A setting was malformed, negative, or inconsistent with the clock.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The explicit node id variable was set but is not a `u16`.
    #[error("invalid node id {value:?} in {var}")]
    InvalidNodeId { var: &'static str, value: String },

    /// The node id check rejected the resolved identity.
    #[error("node id {node_id} rejected by check")]
    NodeIdRejected { node_id: u16 },

    /// No identity signal was available. `hostname` records why the OS host
    /// name layer failed; the source is the address layer's failure.
    #[error("could not resolve a node id (host name: {hostname}; address: {source})")]
    NodeUnresolved {
        hostname: String,
        #[source]
        source: AddressError,
    },

    /// Automatic initialization is blocked by an earlier failed call to
    /// [`Registry::init`].
    ///
    /// [`Registry::init`]: crate::Registry::init
    #[error("generator not initialized: the last explicit initialization failed")]
    NotInitialized,

    /// [`Registry::init`] was called after a generator was published.
    ///
    /// [`Registry::init`]: crate::Registry::init
    #[error("generator already initialized")]
    AlreadyInitialized,
}

impl Error {
    pub(crate) fn invalid_id(input: impl ToString, reason: &'static str) -> Self {
        Self::InvalidIdentifier {
            input: input.to_string(),
            reason,
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors raised by the caller's own cancellation
    /// token rather than by the generator.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}
