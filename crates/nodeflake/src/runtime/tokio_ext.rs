use core::future::Future;

use tokio_util::sync::CancellationToken;

use crate::{Error, Generator, Result, format};

/// Extension trait for waiting out counter failures on the
/// [`tokio`](https://docs.rs/tokio) runtime instead of blocking a thread.
///
/// Classification and budgeting are those of
/// [`Generator::next_id_with_retry`]; the waits are [`tokio::time::sleep`]s
/// raced against a [`CancellationToken`].
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> nodeflake::Result<()> {
/// use nodeflake::{Generator, GeneratorAsyncTokioExt, Settings};
/// use tokio_util::sync::CancellationToken;
///
/// let generator = Generator::new(Settings::new().node_id(3))?;
/// let id = generator
///     .next_id_with_retry_async(&CancellationToken::new())
///     .await?;
/// assert_eq!(nodeflake::decompose(id)?.node, 3);
/// # Ok(())
/// # }
/// ```
pub trait GeneratorAsyncTokioExt {
    /// Generates an identifier, retrying transient counter failures without
    /// blocking the runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if `token` is cancelled before or during the
    ///   call; no attempt is made when it is already cancelled on entry
    /// - [`Error::TimeOverflow`] once the time field is exhausted
    /// - [`Error::ClockBackwardTimeout`] when the budget runs out
    /// - [`Error::NilGenerator`] on an unconfigured generator
    fn next_id_with_retry_async(
        &self,
        token: &CancellationToken,
    ) -> impl Future<Output = Result<i64>> + Send;

    /// [`Self::next_id_with_retry_async`] encoded with [`format`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::next_id_with_retry_async`].
    fn next_id_string_with_retry_async(
        &self,
        token: &CancellationToken,
    ) -> impl Future<Output = Result<String>> + Send;
}

impl GeneratorAsyncTokioExt for Generator {
    async fn next_id_with_retry_async(&self, token: &CancellationToken) -> Result<i64> {
        let inner = self.inner()?;
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let first = match inner.counter().next_id() {
            Ok(id) => return Ok(id),
            Err(err) => err,
        };

        let mut backoff = inner.backoff(first)?;
        loop {
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let wait = backoff.next_wait()?;
            tokio::select! {
                biased;
                () = token.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(wait) => {}
            }
            if let Some(id) = backoff.record(inner.counter().next_id())? {
                return Ok(id);
            }
        }
    }

    async fn next_id_string_with_retry_async(&self, token: &CancellationToken) -> Result<String> {
        self.next_id_with_retry_async(token).await.map(format)
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;
    use std::{
        collections::HashSet,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Instant,
    };

    use super::*;
    use crate::{
        CounterError, LockCounter, SequenceCounter, Settings, TIME_MASK, TimeSource, decompose,
        parse,
    };

    struct FixedTime(u64);

    impl TimeSource for FixedTime {
        fn current_units(&self) -> u64 {
            self.0
        }
    }

    struct Behind(Arc<AtomicUsize>);

    impl SequenceCounter for Behind {
        fn node_id(&self) -> u16 {
            9
        }

        fn next_id(&self) -> Result<i64, CounterError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(CounterError::ClockMovedBackwards { behind: 1 })
        }
    }

    fn behind(settings: Settings) -> (Generator, Arc<AtomicUsize>) {
        let attempts = Arc::new(AtomicUsize::new(0));
        let generator =
            Generator::from_counter(Behind(Arc::clone(&attempts)), settings).unwrap();
        (generator, attempts)
    }

    #[tokio::test]
    async fn generates_ids_for_the_node() {
        let generator = Generator::new(Settings::new().node_id(31)).unwrap();
        let token = CancellationToken::new();

        let id = generator.next_id_with_retry_async(&token).await.unwrap();
        assert_eq!(decompose(id).unwrap().node, 31);

        let text = generator
            .next_id_string_with_retry_async(&token)
            .await
            .unwrap();
        assert!(parse(&text).unwrap() > id);
    }

    #[tokio::test]
    async fn nil_generator_is_rejected() {
        let err = Generator::default()
            .next_id_with_retry_async(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NilGenerator));
    }

    #[tokio::test]
    async fn cancelled_token_makes_no_attempt() {
        let (generator, attempts) = behind(Settings::new());
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            generator.next_id_with_retry_async(&token).await,
            Err(Error::Cancelled)
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn overflow_returns_without_waiting() {
        let generator = Generator::from_counter(
            LockCounter::new(1, FixedTime(TIME_MASK + 1)),
            Settings::new().max_wait(Duration::from_secs(2)),
        )
        .unwrap();
        let start = Instant::now();
        assert!(matches!(
            generator
                .next_id_with_retry_async(&CancellationToken::new())
                .await,
            Err(Error::TimeOverflow)
        ));
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn budget_exhaustion_times_out() {
        let (generator, attempts) = behind(
            Settings::new()
                .max_wait(Duration::from_millis(50))
                .retry_interval(Duration::from_millis(10)),
        );
        let start = Instant::now();
        let err = generator
            .next_id_with_retry_async(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ClockBackwardTimeout { .. }), "{err}");
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(attempts.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancellation_interrupts_sleep() {
        let (generator, _) = behind(
            Settings::new()
                .max_wait(Duration::from_secs(30))
                .retry_interval(Duration::from_secs(10)),
        );
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        assert!(matches!(
            generator.next_id_with_retry_async(&token).await,
            Err(Error::Cancelled)
        ));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_tasks_yield_distinct_ids() {
        const TASKS: usize = 8;
        const IDS_PER_TASK: usize = 512;

        let generator = Generator::new(Settings::new().node_id(5)).unwrap();
        let token = CancellationToken::new();

        let handles: Vec<_> = (0..TASKS)
            .map(|_| {
                let generator = generator.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    let mut ids = Vec::with_capacity(IDS_PER_TASK);
                    for _ in 0..IDS_PER_TASK {
                        ids.push(generator.next_id_with_retry_async(&token).await?);
                    }
                    Ok::<_, Error>(ids)
                })
            })
            .collect();

        let mut seen = HashSet::with_capacity(TASKS * IDS_PER_TASK);
        for handle in handles {
            for id in handle.await.unwrap().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), TASKS * IDS_PER_TASK);
    }
}
