pub mod format;
pub use format::{parse_duration, IntoNanos, TimeUnit};
