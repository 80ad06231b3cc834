use crate::host::Host;
use crate::time::TimeUnit;
use crate::timer::PrecisionTimer;
use std::rc::Rc;
use std::time::Duration;

/// Completion handle injected into an asynchronous [`measure_async`] task.
/// Dropping it without calling [`done`](Self::done) discards the
/// measurement and its callback.
///
/// [`measure_async`]: PrecisionTimer::measure_async
pub struct Stopwatch<H: Host> {
    host: Rc<H>,
    origin: Duration,
    unit: TimeUnit,
    callback: Box<dyn FnOnce(f64)>,
}

impl<H: Host> Stopwatch<H> {
    /// Stops the clock and invokes the callback with the elapsed time in
    /// the requested unit.
    pub fn done(self) {
        let elapsed = self.host.now().saturating_sub(self.origin);
        (self.callback)(self.unit.convert(elapsed));
    }
}

/// Elapsed-time instrumentation, independent of the wait/repeat state.
impl<H: Host> PrecisionTimer<H> {
    /// Runs `task` synchronously and returns the raw high-resolution
    /// elapsed time.
    pub fn measure<F: FnOnce()>(&self, task: F) -> Duration {
        let start = self.host.now();
        task();
        self.host.now().saturating_sub(start)
    }

    /// Runs `task` synchronously and returns its elapsed time converted
    /// into `unit`.
    pub fn measure_in<F: FnOnce()>(&self, task: F, unit: TimeUnit) -> f64 {
        unit.convert(self.measure(task))
    }

    /// Measures an asynchronous task. The task receives a [`Stopwatch`];
    /// when it calls [`Stopwatch::done`] — at whatever later point its
    /// work completes — the callback receives the elapsed time since this
    /// call, in `unit`.
    pub fn measure_async<F, C>(&self, task: F, unit: TimeUnit, callback: C)
    where
        F: FnOnce(Stopwatch<H>),
        C: FnOnce(f64) + 'static,
    {
        task(Stopwatch {
            host: Rc::clone(&self.host),
            origin: self.host.now(),
            unit,
            callback: Box::new(callback),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeHost;
    use rstest::rstest;
    use std::cell::{Cell, RefCell};

    #[test]
    fn test_measure_sync_returns_the_task_duration() {
        let host = FakeHost::new();
        let timer = PrecisionTimer::new(Rc::clone(&host));

        let advance_host = Rc::clone(&host);
        let elapsed = timer.measure(move || advance_host.advance(Duration::from_millis(5)));

        assert_eq!(elapsed, Duration::from_millis(5));
    }

    #[rstest]
    #[case::seconds(TimeUnit::Seconds, 0.005)]
    #[case::millis(TimeUnit::Millis, 5.0)]
    #[case::micros(TimeUnit::Micros, 5_000.0)]
    #[case::nanos(TimeUnit::Nanos, 5_000_000.0)]
    fn test_measure_in_converts_units(#[case] unit: TimeUnit, #[case] expected: f64) {
        let host = FakeHost::new();
        let timer = PrecisionTimer::new(Rc::clone(&host));

        let advance_host = Rc::clone(&host);
        let value = timer.measure_in(move || advance_host.advance(Duration::from_millis(5)), unit);

        assert_eq!(value, expected);
        assert!(value >= 0.0);
    }

    #[test]
    fn test_measure_async_reports_elapsed_at_completion() {
        let host = FakeHost::new();
        let timer = PrecisionTimer::new(Rc::clone(&host));
        let stopwatch = RefCell::new(None);
        let reported = Rc::new(Cell::new(None));

        let report = Rc::clone(&reported);
        timer.measure_async(
            |sw| *stopwatch.borrow_mut() = Some(sw),
            TimeUnit::Millis,
            move |elapsed| report.set(Some(elapsed)),
        );
        assert!(reported.get().is_none(), "callback must wait for done()");

        host.advance(Duration::from_millis(7));
        stopwatch
            .borrow_mut()
            .take()
            .expect("task never received a stopwatch")
            .done();

        assert_eq!(reported.get(), Some(7.0));
    }

    #[test]
    fn test_measure_of_noop_task_is_non_negative() {
        let host = FakeHost::new();
        let timer = PrecisionTimer::new(Rc::clone(&host));

        assert!(timer.measure_in(|| {}, TimeUnit::Millis) >= 0.0);
    }
}
