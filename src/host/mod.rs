pub mod event_loop;
pub use event_loop::EventLoop;

use std::time::Duration;

/// A deferred invocation registered with the host.
pub type Thunk = Box<dyn FnOnce()>;

/// Opaque id for a pending coarse-timer or yield registration, used to
/// cancel it before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostHandle(pub(crate) u64);

/// The three capabilities the engine consumes from its platform.
///
/// Implementations are expected to be single-threaded and cooperative: a
/// registered thunk runs from the host's own dispatch loop, never
/// concurrently with the code that registered it.
pub trait Host {
    /// Monotonic high-resolution clock, immune to wall-clock adjustment.
    fn now(&self) -> Duration;

    /// Deferred invocation with millisecond-scale granularity. Extra
    /// latency beyond `delay` is tolerated; firing early is not expected
    /// but must not break callers.
    fn schedule_coarse(&self, delay: Duration, thunk: Thunk) -> HostHandle;

    fn cancel_coarse(&self, handle: HostHandle);

    /// The finest-grained "run at the next scheduling opportunity" the
    /// host provides.
    fn schedule_yield(&self, thunk: Thunk) -> HostHandle;

    fn cancel_yield(&self, handle: HostHandle);
}
