mod builder;
pub use builder::Builder;

mod errors;
pub use errors::TimerError;

mod measure;
pub use measure::Stopwatch;

mod state;

mod timer;
pub use timer::{PrecisionTimer, RepeatReport, WaitOutcome};
