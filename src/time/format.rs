use crate::timer::TimerError;
use std::time::Duration;

pub(crate) const NANOS_PER_SEC: u64 = 1_000_000_000;
pub(crate) const NANOS_PER_MILLI: u64 = 1_000_000;
pub(crate) const NANOS_PER_MICRO: u64 = 1_000;

/// The units of the duration grammar: an integer followed by `s` for
/// seconds, `m` for milli, `u` for micro and `n` for nanoseconds. Ex. `2u`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Seconds,
    Millis,
    Micros,
    Nanos,
}

impl TimeUnit {
    pub fn from_suffix(suffix: char) -> Option<Self> {
        match suffix {
            's' => Some(TimeUnit::Seconds),
            'm' => Some(TimeUnit::Millis),
            'u' => Some(TimeUnit::Micros),
            'n' => Some(TimeUnit::Nanos),
            _ => None,
        }
    }

    pub(crate) const fn nanos(self) -> u64 {
        match self {
            TimeUnit::Seconds => NANOS_PER_SEC,
            TimeUnit::Millis => NANOS_PER_MILLI,
            TimeUnit::Micros => NANOS_PER_MICRO,
            TimeUnit::Nanos => 1,
        }
    }

    /// Converts a high-resolution elapsed time into this unit.
    pub fn convert(self, elapsed: Duration) -> f64 {
        elapsed.as_nanos() as f64 / self.nanos() as f64
    }
}

/// Parses the `<integer><unit>` duration grammar into nanoseconds.
///
/// Empty input is [`TimerError::MissingDuration`]; a missing or unknown
/// suffix, a non-integer numeric portion, or a value that overflows the
/// nanosecond range is [`TimerError::InvalidDurationFormat`].
pub fn parse_duration(input: &str) -> Result<u64, TimerError> {
    if input.is_empty() {
        return Err(TimerError::MissingDuration);
    }

    let invalid = || TimerError::InvalidDurationFormat {
        input: input.to_string(),
    };

    let mut chars = input.chars();
    let Some(suffix) = chars.next_back() else {
        return Err(TimerError::MissingDuration);
    };
    let unit = TimeUnit::from_suffix(suffix).ok_or_else(invalid)?;

    let value: u64 = chars.as_str().parse().map_err(|_| invalid())?;
    value.checked_mul(unit.nanos()).ok_or_else(invalid)
}

/// Conversion into the engine's nanosecond representation. Strings go
/// through the duration grammar; bare integers are implicitly milliseconds,
/// matching the grammar's `m` suffix.
pub trait IntoNanos {
    fn into_nanos(self) -> Result<u64, TimerError>;
}

impl IntoNanos for &str {
    fn into_nanos(self) -> Result<u64, TimerError> {
        parse_duration(self)
    }
}

impl IntoNanos for String {
    fn into_nanos(self) -> Result<u64, TimerError> {
        parse_duration(&self)
    }
}

impl IntoNanos for u64 {
    fn into_nanos(self) -> Result<u64, TimerError> {
        self.checked_mul(NANOS_PER_MILLI)
            .ok_or(TimerError::InvalidDurationFormat {
                input: format!("{self}m"),
            })
    }
}

impl IntoNanos for u32 {
    fn into_nanos(self) -> Result<u64, TimerError> {
        (self as u64).into_nanos()
    }
}

impl IntoNanos for Duration {
    fn into_nanos(self) -> Result<u64, TimerError> {
        u64::try_from(self.as_nanos()).map_err(|_| TimerError::InvalidDurationFormat {
            input: format!("{self:?}"),
        })
    }
}
