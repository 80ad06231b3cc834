use crate::host::Host;
use crate::time::format::NANOS_PER_MILLI;
use crate::time::IntoNanos;
use crate::timer::{PrecisionTimer, TimerError};
use std::rc::Rc;

/// Below this remaining window the engine stops deferring to the coarse
/// host timer and spins on the yield queue instead.
const DEFAULT_PRECISION: u64 = 25 * NANOS_PER_MILLI;

/// Ceiling for the `interval * tick_count` product before the repeat
/// origin is rebased. ~92.6 days of cadence.
const DEFAULT_OVERFLOW_CEILING: u64 = 8_000_000_000_000_000;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Config {
    pub(crate) precision: u64,
    pub(crate) overflow_ceiling: u64,
    pub(crate) logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            overflow_ceiling: DEFAULT_OVERFLOW_CEILING,
            logging: false,
        }
    }
}

/// Construction-time configuration for a [`PrecisionTimer`].
///
/// ```
/// use std::rc::Rc;
/// use nanotick::{Builder, EventLoop};
///
/// let host = Rc::new(EventLoop::new());
/// let timer = Builder::new().precision("100u")?.logging(true).build(host);
/// assert!(!timer.is_waiting());
/// # Ok::<(), nanotick::TimerError>(())
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Sets the precision threshold, in the same duration grammar as
    /// delays and intervals (bare integers are milliseconds).
    pub fn precision<D: IntoNanos>(&mut self, precision: D) -> Result<&mut Self, TimerError> {
        self.config.precision = precision.into_nanos()?;
        Ok(self)
    }

    /// Overrides the repeat-counter overflow ceiling, in nanoseconds.
    pub fn overflow_ceiling(&mut self, ceiling: u64) -> &mut Self {
        self.config.overflow_ceiling = ceiling;
        self
    }

    /// Routes cycle-time observations to `tracing` at debug level. Inert
    /// to scheduling behavior.
    pub fn logging(&mut self, enabled: bool) -> &mut Self {
        self.config.logging = enabled;
        self
    }

    pub fn build<H: Host + 'static>(&self, host: Rc<H>) -> PrecisionTimer<H> {
        PrecisionTimer::with_config(host, self.config)
    }
}
