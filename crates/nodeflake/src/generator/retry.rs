use core::time::Duration;
use std::time::Instant;

use crate::{CounterError, Error, Result};

/// Maps a fatal counter failure to [`Error::TimeOverflow`] and passes
/// retryable ones through.
pub(crate) fn classify(err: CounterError) -> Result<CounterError> {
    if err.is_fatal() {
        Err(Error::TimeOverflow)
    } else {
        Ok(err)
    }
}

/// Budget of one retrying call, started after its first failed attempt.
#[derive(Debug)]
pub(crate) struct Backoff {
    started: Instant,
    deadline: Option<Instant>,
    retry_interval: Duration,
    last: CounterError,
}

impl Backoff {
    /// Starts the budget now. Fatal failures never get one.
    pub(crate) fn start(
        first: CounterError,
        max_wait: Duration,
        retry_interval: Duration,
    ) -> Result<Self> {
        let last = classify(first)?;
        let started = Instant::now();
        Ok(Self {
            started,
            deadline: started.checked_add(max_wait),
            retry_interval,
            last,
        })
    }

    /// The next wait: the retry interval, capped at the remaining budget.
    ///
    /// # Errors
    ///
    /// [`Error::ClockBackwardTimeout`] carrying the last counter failure and
    /// the time spent since the budget started, once the budget is spent.
    pub(crate) fn next_wait(&self) -> Result<Duration> {
        let now = Instant::now();
        let remaining = match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(now),
            None => Duration::MAX,
        };
        if remaining.is_zero() {
            return Err(Error::ClockBackwardTimeout {
                waited: now.saturating_duration_since(self.started),
                source: self.last.clone(),
            });
        }
        Ok(self.retry_interval.min(remaining))
    }

    /// Records an attempt made after a wait. `Ok(Some(id))` ends the loop,
    /// `Ok(None)` asks for another round.
    pub(crate) fn record(&mut self, attempt: Result<i64, CounterError>) -> Result<Option<i64>> {
        match attempt {
            Ok(id) => Ok(Some(id)),
            Err(err) => {
                self.last = classify(err)?;
                Ok(None)
            }
        }
    }
}
