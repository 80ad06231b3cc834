pub mod host;
pub use host::{EventLoop, Host, HostHandle, Thunk};

pub mod time;
pub use time::{parse_duration, IntoNanos, TimeUnit};

pub mod timer;
pub use timer::{Builder, PrecisionTimer, RepeatReport, Stopwatch, TimerError, WaitOutcome};

#[cfg(test)]
mod test_utils;
