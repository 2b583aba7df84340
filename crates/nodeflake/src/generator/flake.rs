use core::{fmt, time::Duration};
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    counter::{CounterError, LockCounter, SequenceCounter},
    error::{Error, Result},
    generator::{Backoff, CancelToken, Settings, classify},
    id::format,
    node::{NodeIdSource, NodeIdentity, NodeSignals, SystemSignals},
    time::MonotonicClock,
};

pub(crate) struct Inner {
    counter: Box<dyn SequenceCounter>,
    node: NodeIdentity,
    max_wait: Duration,
    retry_interval: Duration,
}

/// A shareable identifier generator bound to one node id.
///
/// A `Generator` is immutable after construction and cheap to clone; clones
/// share the same counter. All methods take `&self` and may be called from
/// many threads at once.
///
/// `Generator::default()` is an unconfigured value (for example a field of a
/// `#[derive(Default)]` struct). Every method on it returns
/// [`Error::NilGenerator`].
///
/// ## Choosing a call
/// - [`Self::next_id`]: one attempt, no waiting.
/// - [`Self::next_id_with_retry`]: rides out transient counter failures for
///   up to the configured max wait.
/// - `*_string` variants: the same, encoded with [`format`].
/// - `must_*` variants: panic on failure; for startup code only.
#[derive(Clone, Default)]
pub struct Generator {
    inner: Option<Arc<Inner>>,
}

impl Generator {
    /// Builds a generator on a [`LockCounter`] and [`MonotonicClock`],
    /// resolving the node id from the process environment unless `settings`
    /// overrides it.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidNodeId`] or [`Error::NodeUnresolved`] if the node id
    ///   cannot be resolved
    /// - [`Error::NodeIdRejected`] if the check rejects the node id
    /// - [`Error::InvalidConfig`] if the epoch is ahead of the system clock
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_signals(settings, &SystemSignals)
    }

    /// Like [`Self::new`], resolving the node id from `signals`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn with_signals<S>(settings: Settings, signals: &S) -> Result<Self>
    where
        S: NodeSignals + ?Sized,
    {
        let node = settings.resolve_node(signals)?;
        let clock = MonotonicClock::with_epoch(settings.resolved_epoch())?;
        Ok(Self::assemble(
            Box::new(LockCounter::new(node.id, clock)),
            node,
            &settings,
        ))
    }

    /// Wraps a caller-provided counter. The node id comes from the counter;
    /// the override in `settings` is not consulted, but the check is.
    ///
    /// # Errors
    ///
    /// [`Error::NodeIdRejected`] if the check rejects the counter's node id.
    pub fn from_counter<C>(counter: C, settings: Settings) -> Result<Self>
    where
        C: SequenceCounter + 'static,
    {
        let node = NodeIdentity {
            id: counter.node_id(),
            source: NodeIdSource::Override,
        };
        settings.check(node.id)?;
        Ok(Self::assemble(Box::new(counter), node, &settings))
    }

    fn assemble(counter: Box<dyn SequenceCounter>, node: NodeIdentity, settings: &Settings) -> Self {
        Self {
            inner: Some(Arc::new(Inner {
                counter,
                node,
                max_wait: settings.resolved_max_wait(),
                retry_interval: settings.resolved_retry_interval(),
            })),
        }
    }

    pub(crate) fn inner(&self) -> Result<&Inner> {
        self.inner.as_deref().ok_or(Error::NilGenerator)
    }

    /// Returns `false` for the default, unconfigured generator.
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }

    /// The node id packed into every identifier.
    ///
    /// # Errors
    ///
    /// [`Error::NilGenerator`] on an unconfigured generator.
    pub fn node_id(&self) -> Result<u16> {
        Ok(self.inner()?.node.id)
    }

    /// The node id and the signal it was resolved from.
    ///
    /// # Errors
    ///
    /// [`Error::NilGenerator`] on an unconfigured generator.
    pub fn node_identity(&self) -> Result<NodeIdentity> {
        Ok(self.inner()?.node)
    }

    /// Upper bound on the waiting done by one retrying call.
    ///
    /// # Errors
    ///
    /// [`Error::NilGenerator`] on an unconfigured generator.
    pub fn max_wait(&self) -> Result<Duration> {
        Ok(self.inner()?.max_wait)
    }

    /// Delay between retry attempts.
    ///
    /// # Errors
    ///
    /// [`Error::NilGenerator`] on an unconfigured generator.
    pub fn retry_interval(&self) -> Result<Duration> {
        Ok(self.inner()?.retry_interval)
    }

    /// Generates an identifier with a single attempt.
    ///
    /// # Errors
    ///
    /// - [`Error::TimeOverflow`] once the time field is exhausted
    /// - [`Error::Counter`] for a retryable counter failure
    /// - [`Error::NilGenerator`] on an unconfigured generator
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<i64> {
        let inner = self.inner()?;
        inner
            .counter
            .next_id()
            .map_err(|err| classify(err).map_or_else(|fatal| fatal, Error::Counter))
    }

    /// Generates an identifier, retrying transient counter failures.
    ///
    /// The first attempt is made immediately. A fatal failure returns
    /// [`Error::TimeOverflow`] without waiting. Any other failure starts a
    /// budget of `max_wait`: the call waits `min(retry_interval, remaining)`
    /// between attempts and checks `token` before every wait.
    ///
    /// # Errors
    ///
    /// - the token's error ([`Error::Cancelled`] or
    ///   [`Error::DeadlineExceeded`]), including when it is already cancelled
    ///   on entry, in which case no attempt is made
    /// - [`Error::TimeOverflow`] once the time field is exhausted
    /// - [`Error::ClockBackwardTimeout`] when the budget runs out
    /// - [`Error::NilGenerator`] on an unconfigured generator
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip_all))]
    pub fn next_id_with_retry(&self, token: &CancelToken) -> Result<i64> {
        let inner = self.inner()?;
        token.check()?;

        let first = match inner.counter.next_id() {
            Ok(id) => return Ok(id),
            Err(err) => err,
        };

        let mut backoff = inner.backoff(first)?;
        loop {
            token.check()?;
            let wait = backoff.next_wait()?;
            token.wait_timeout(wait)?;
            if let Some(id) = backoff.record(inner.counter.next_id())? {
                return Ok(id);
            }
        }
    }

    /// [`Self::next_id`] encoded with [`format`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::next_id`].
    pub fn next_id_string(&self) -> Result<String> {
        self.next_id().map(format)
    }

    /// [`Self::next_id_with_retry`] encoded with [`format`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::next_id_with_retry`].
    pub fn next_id_string_with_retry(&self, token: &CancelToken) -> Result<String> {
        self.next_id_with_retry(token).map(format)
    }

    /// [`Self::next_id`], panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics on any error. Only use this where crashing is the right
    /// response, such as during startup.
    pub fn must_next_id(&self) -> i64 {
        match self.next_id() {
            Ok(id) => id,
            Err(e) => panic!("nodeflake: failed to generate id: {e}"),
        }
    }

    /// [`Self::next_id_string`], panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics on any error. Only use this where crashing is the right
    /// response, such as during startup.
    pub fn must_next_id_string(&self) -> String {
        format(self.must_next_id())
    }
}

impl Inner {
    pub(crate) fn counter(&self) -> &dyn SequenceCounter {
        self.counter.as_ref()
    }

    pub(crate) fn backoff(&self, first: CounterError) -> Result<Backoff> {
        Backoff::start(first, self.max_wait, self.retry_interval)
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => f
                .debug_struct("Generator")
                .field("node", &inner.node)
                .field("max_wait", &inner.max_wait)
                .field("retry_interval", &inner.retry_interval)
                .finish_non_exhaustive(),
            None => f.write_str("Generator(nil)"),
        }
    }
}
