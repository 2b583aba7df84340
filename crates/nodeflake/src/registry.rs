use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::{CancelToken, Error, Generator, Result, Settings};

/// Builds the generator published by automatic initialization.
pub type GeneratorFactory = fn() -> Result<Generator>;

/// Automatic initialization: node id from the process environment, durations
/// from [`Settings::from_env`].
pub fn default_generator() -> Result<Generator> {
    Generator::new(Settings::from_env()?)
}

/// A slot holding at most one [`Generator`] for its whole lifetime.
///
/// Reads of a published generator never lock. Publication happens either
/// explicitly through [`Registry::init`] or automatically on the first
/// [`Registry::get`], under a mutex that also records whether an explicit
/// initialization was attempted:
///
/// - once a generator is published it is never replaced
/// - a failed [`Registry::init`] blocks automatic initialization
///   ([`Error::NotInitialized`]) until a later [`Registry::init`] succeeds
///
/// The crate-level free functions ([`init`], [`next_id`], ...) use a
/// process-wide instance.
///
/// ```
/// use nodeflake::{Registry, Settings};
///
/// static IDS: Registry = Registry::new();
///
/// IDS.init(Settings::new().node_id(9))?;
/// assert_eq!(IDS.get()?.node_id()?, 9);
/// # Ok::<(), nodeflake::Error>(())
/// ```
#[derive(Debug)]
pub struct Registry {
    slot: OnceLock<Generator>,
    explicit_attempted: Mutex<bool>,
    factory: GeneratorFactory,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// An empty registry using [`default_generator`] for automatic
    /// initialization.
    pub const fn new() -> Self {
        Self::with_factory(default_generator)
    }

    /// An empty registry using `factory` for automatic initialization.
    pub const fn with_factory(factory: GeneratorFactory) -> Self {
        Self {
            slot: OnceLock::new(),
            explicit_attempted: parking_lot::const_mutex(false),
            factory,
        }
    }

    /// Returns `true` once a generator has been published.
    pub fn is_initialized(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Returns the published generator, building and publishing one with the
    /// factory if nothing was published and no explicit initialization was
    /// attempted.
    ///
    /// # Errors
    ///
    /// - [`Error::NotInitialized`] if the last [`Self::init`] failed
    /// - the factory's error; automatic initialization is attempted again on
    ///   the next call
    pub fn get(&self) -> Result<&Generator> {
        if let Some(generator) = self.slot.get() {
            return Ok(generator);
        }
        self.get_slow()
    }

    #[cold]
    #[inline(never)]
    fn get_slow(&self) -> Result<&Generator> {
        let explicit_attempted = self.explicit_attempted.lock();
        if let Some(generator) = self.slot.get() {
            return Ok(generator);
        }
        if *explicit_attempted {
            return Err(Error::NotInitialized);
        }

        let generator = (self.factory)().inspect_err(|_e| {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_e, "automatic generator initialization failed");
        })?;
        #[cfg(feature = "tracing")]
        tracing::debug!(generator = ?generator, "published generator (automatic)");
        Ok(self.publish(generator))
    }

    /// Builds a generator from `settings` and publishes it.
    ///
    /// A failed call leaves the registry empty and may be retried; until it
    /// succeeds, automatic initialization reports [`Error::NotInitialized`].
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyInitialized`] if a generator is already published
    /// - any construction error of [`Generator::new`]
    pub fn init(&self, settings: Settings) -> Result<&Generator> {
        let mut explicit_attempted = self.explicit_attempted.lock();
        if self.slot.get().is_some() {
            return Err(Error::AlreadyInitialized);
        }
        *explicit_attempted = true;

        let generator = Generator::new(settings).inspect_err(|_e| {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_e, "explicit generator initialization failed");
        })?;
        #[cfg(feature = "tracing")]
        tracing::debug!(generator = ?generator, "published generator (explicit)");
        Ok(self.publish(generator))
    }

    /// [`Self::init`], panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if initialization fails or a generator is already published.
    pub fn must_init(&self, settings: Settings) -> &Generator {
        match self.init(settings) {
            Ok(generator) => generator,
            Err(e) => panic!("nodeflake: failed to initialize generator: {e}"),
        }
    }

    /// Like [`Self::init`], publishing an already constructed generator.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyInitialized`] if a generator is already published, and
    /// [`Error::NilGenerator`] for an unconfigured `generator`.
    pub fn install(&self, generator: Generator) -> Result<&Generator> {
        let mut explicit_attempted = self.explicit_attempted.lock();
        if self.slot.get().is_some() {
            return Err(Error::AlreadyInitialized);
        }
        *explicit_attempted = true;
        if !generator.is_configured() {
            return Err(Error::NilGenerator);
        }
        Ok(self.publish(generator))
    }

    // Callers hold the mutex, so the slot is still empty.
    fn publish(&self, generator: Generator) -> &Generator {
        self.slot.get_or_init(|| generator)
    }
}

static GLOBAL: Registry = Registry::new();

/// Initializes the process-wide generator from `settings`.
///
/// # Errors
///
/// See [`Registry::init`].
pub fn init(settings: Settings) -> Result<&'static Generator> {
    GLOBAL.init(settings)
}

/// The process-wide generator, initialized automatically on first use unless
/// an explicit [`init`] failed.
///
/// # Errors
///
/// See [`Registry::get`].
pub fn global() -> Result<&'static Generator> {
    GLOBAL.get()
}

/// [`Generator::next_id`] on the process-wide generator.
///
/// # Errors
///
/// Initialization errors of [`global`], then those of [`Generator::next_id`].
pub fn next_id() -> Result<i64> {
    global()?.next_id()
}

/// [`Generator::next_id_with_retry`] on the process-wide generator.
///
/// # Errors
///
/// Initialization errors of [`global`], then those of
/// [`Generator::next_id_with_retry`].
pub fn next_id_with_retry(token: &CancelToken) -> Result<i64> {
    global()?.next_id_with_retry(token)
}

/// [`Generator::next_id_string`] on the process-wide generator.
///
/// # Errors
///
/// Initialization errors of [`global`], then those of
/// [`Generator::next_id_string`].
pub fn next_id_string() -> Result<String> {
    global()?.next_id_string()
}

/// [`Generator::next_id_string_with_retry`] on the process-wide generator.
///
/// # Errors
///
/// Initialization errors of [`global`], then those of
/// [`Generator::next_id_string_with_retry`].
pub fn next_id_string_with_retry(token: &CancelToken) -> Result<String> {
    global()?.next_id_string_with_retry(token)
}

/// [`init`], panicking on failure.
///
/// # Panics
///
/// Panics if initialization fails or a generator is already published.
pub fn must_init(settings: Settings) -> &'static Generator {
    GLOBAL.must_init(settings)
}

/// [`next_id`], panicking on failure.
///
/// # Panics
///
/// Panics on any error. Only use this where crashing is the right response,
/// such as during startup.
pub fn must_next_id() -> i64 {
    match next_id() {
        Ok(id) => id,
        Err(e) => panic!("nodeflake: failed to generate id: {e}"),
    }
}

/// [`next_id_string`], panicking on failure.
///
/// # Panics
///
/// Panics on any error. Only use this where crashing is the right response,
/// such as during startup.
pub fn must_next_id_string() -> String {
    crate::format(must_next_id())
}
