use core::{fmt, time::Duration};
use std::env::VarError;

use crate::{
    DEFAULT_EPOCH, Error, NodeIdSource, NodeIdentity, NodeSignals, Result, node::present,
    resolve_node_identity_with,
};

/// Default upper bound on the time a retrying call spends waiting.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(500);

/// Default delay between retry attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Environment variable read by [`Settings::from_env`] for the max wait, in
/// signed milliseconds.
pub const MAX_WAIT_VAR: &str = "NODEFLAKE_MAX_WAIT_MS";

/// Environment variable read by [`Settings::from_env`] for the retry
/// interval, in signed milliseconds.
pub const RETRY_INTERVAL_VAR: &str = "NODEFLAKE_RETRY_INTERVAL_MS";

type NodeIdFn = Box<dyn Fn() -> Result<u16> + Send + Sync>;
type NodeIdCheck = Box<dyn Fn(u16) -> bool + Send + Sync>;

/// Construction options for a [`Generator`].
///
/// Every option is optional. An option that is never set uses its documented
/// default; setting it explicitly, even to zero, always takes effect:
/// `max_wait(Duration::ZERO)` means "never wait" and
/// `retry_interval(Duration::ZERO)` means "retry without delay".
///
/// ```
/// use nodeflake::{Generator, Settings};
/// use std::time::Duration;
///
/// let generator = Generator::new(
///     Settings::new()
///         .node_id(12)
///         .check_node_id(|id| id != 0)
///         .max_wait(Duration::from_millis(50))
///         .retry_interval(Duration::ZERO),
/// )?;
/// assert_eq!(generator.node_id()?, 12);
/// assert_eq!(generator.retry_interval()?, Duration::ZERO);
/// # Ok::<(), nodeflake::Error>(())
/// ```
///
/// [`Generator`]: crate::Generator
#[derive(Default)]
pub struct Settings {
    node_id: Option<NodeIdFn>,
    check_node_id: Option<NodeIdCheck>,
    max_wait: Option<Duration>,
    retry_interval: Option<Duration>,
    epoch: Option<Duration>,
}

impl Settings {
    /// Settings with every option unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads [`MAX_WAIT_VAR`] and [`RETRY_INTERVAL_VAR`] from the process
    /// environment. Unset or empty variables leave the option unset, the same
    /// rule node id resolution applies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a variable is not UTF-8, not an
    /// integer, or negative.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name))
    }

    /// Like [`Self::from_env`], reading variables through `lookup`, which has
    /// the contract of [`std::env::var`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a variable is not UTF-8, not an
    /// integer, or negative.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let read = |var: &str| -> Result<Option<Duration>> {
            match present(lookup(var)) {
                Ok(Some(raw)) => parse_millis(var, &raw).map(Some),
                Ok(None) => Ok(None),
                Err(raw) => Err(Error::invalid_config(format!(
                    "{var}={raw:?} is not valid UTF-8"
                ))),
            }
        };
        Ok(Self {
            max_wait: read(MAX_WAIT_VAR)?,
            retry_interval: read(RETRY_INTERVAL_VAR)?,
            ..Self::new()
        })
    }

    /// Uses `f` instead of the environment to obtain the node id.
    pub fn node_id_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<u16> + Send + Sync + 'static,
    {
        self.node_id = Some(Box::new(f));
        self
    }

    /// Uses a fixed node id.
    pub fn node_id(self, id: u16) -> Self {
        self.node_id_fn(move || Ok(id))
    }

    /// Rejects construction when `check` returns `false` for the resolved
    /// node id.
    pub fn check_node_id<F>(mut self, check: F) -> Self
    where
        F: Fn(u16) -> bool + Send + Sync + 'static,
    {
        self.check_node_id = Some(Box::new(check));
        self
    }

    /// Upper bound on the total wait of one retrying call.
    /// Defaults to [`DEFAULT_MAX_WAIT`].
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Delay between retry attempts. Defaults to [`DEFAULT_RETRY_INTERVAL`].
    pub fn retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = Some(retry_interval);
        self
    }

    /// Origin of the time field as a [`Duration`] since 1970-01-01 UTC.
    /// Defaults to [`DEFAULT_EPOCH`].
    pub fn epoch(mut self, epoch: Duration) -> Self {
        self.epoch = Some(epoch);
        self
    }

    pub(crate) fn resolved_max_wait(&self) -> Duration {
        self.max_wait.unwrap_or(DEFAULT_MAX_WAIT)
    }

    pub(crate) fn resolved_retry_interval(&self) -> Duration {
        self.retry_interval.unwrap_or(DEFAULT_RETRY_INTERVAL)
    }

    pub(crate) fn resolved_epoch(&self) -> Duration {
        self.epoch.unwrap_or(DEFAULT_EPOCH)
    }

    /// Resolves the node id through the override, falling back to `signals`,
    /// and applies the check.
    pub(crate) fn resolve_node<S>(&self, signals: &S) -> Result<NodeIdentity>
    where
        S: NodeSignals + ?Sized,
    {
        let node = match &self.node_id {
            Some(f) => NodeIdentity {
                id: f()?,
                source: NodeIdSource::Override,
            },
            None => resolve_node_identity_with(signals)?,
        };
        self.check(node.id)?;
        Ok(node)
    }

    pub(crate) fn check(&self, node_id: u16) -> Result<()> {
        match &self.check_node_id {
            Some(check) if !check(node_id) => Err(Error::NodeIdRejected { node_id }),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("node_id", &self.node_id.as_ref().map(|_| "<fn>"))
            .field("check_node_id", &self.check_node_id.as_ref().map(|_| "<fn>"))
            .field("max_wait", &self.max_wait)
            .field("retry_interval", &self.retry_interval)
            .field("epoch", &self.epoch)
            .finish()
    }
}

fn parse_millis(var: &str, raw: &str) -> Result<Duration> {
    let millis: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::invalid_config(format!("{var}={raw:?} is not an integer")))?;
    let millis = u64::try_from(millis)
        .map_err(|_| Error::invalid_config(format!("{var}={millis} must not be negative")))?;
    Ok(Duration::from_millis(millis))
}
