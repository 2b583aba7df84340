use core::time::Duration;
use std::{sync::Arc, time::Instant};

use parking_lot::{Condvar, Mutex};

use crate::{Error, Result};

#[derive(Debug, Default)]
struct TokenState {
    cancelled: Mutex<bool>,
    wake: Condvar,
    deadline: Option<Instant>,
}

/// A cloneable cancellation signal for blocking calls.
///
/// Clones share state: cancelling any clone cancels them all. A token may
/// also carry a deadline, after which it reports
/// [`Error::DeadlineExceeded`] on its own.
///
/// ```
/// use nodeflake::{CancelToken, Error};
///
/// let token = CancelToken::new();
/// let other = token.clone();
/// other.cancel();
/// assert!(matches!(token.check(), Err(Error::Cancelled)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    state: Arc<TokenState>,
}

impl CancelToken {
    /// A token that is only cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            state: Arc::new(TokenState {
                deadline: Some(deadline),
                ..TokenState::default()
            }),
        }
    }

    /// A token that expires `timeout` from now. A timeout too large to
    /// represent never expires.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            None => Self::new(),
        }
    }

    /// Cancels the token and wakes every waiter.
    pub fn cancel(&self) {
        *self.state.cancelled.lock() = true;
        self.state.wake.notify_all();
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.state.deadline
    }

    /// Returns `true` if the token was cancelled or its deadline passed.
    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// Reports the token's own error, if it has one.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`] after [`Self::cancel`], otherwise
    /// [`Error::DeadlineExceeded`] once the deadline passed.
    pub fn check(&self) -> Result<()> {
        Self::status(*self.state.cancelled.lock(), self.state.deadline, Instant::now())
    }

    /// Blocks for `timeout`, returning early with the token's error if it is
    /// cancelled or expires in the meantime.
    ///
    /// # Errors
    ///
    /// Same as [`Self::check`].
    pub fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        let until = Instant::now().checked_add(timeout);
        let mut cancelled = self.state.cancelled.lock();
        loop {
            let now = Instant::now();
            Self::status(*cancelled, self.state.deadline, now)?;
            if until.is_some_and(|until| now >= until) {
                return Ok(());
            }
            let wake_at = match (until, self.state.deadline) {
                (Some(until), Some(deadline)) => Some(until.min(deadline)),
                (until, deadline) => until.or(deadline),
            };
            match wake_at {
                Some(at) => {
                    self.state.wake.wait_until(&mut cancelled, at);
                }
                None => self.state.wake.wait(&mut cancelled),
            }
        }
    }

    fn status(cancelled: bool, deadline: Option<Instant>, now: Instant) -> Result<()> {
        if cancelled {
            return Err(Error::Cancelled);
        }
        match deadline {
            Some(deadline) if now >= deadline => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
