use crate::host::{Host, Thunk};
use crate::time::IntoNanos;
use crate::timer::builder::Config;
use crate::timer::state::{Core, Registration, RepeatCallback, RepeatTask, WaitCallback, WaitTask};
use crate::timer::{Builder, TimerError};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Passed to a wait callback when the one-shot completes or is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The deadline was reached and the task ran. `elapsed` is the actual
    /// wait, never less than the requested delay.
    Fired { elapsed: Duration },
    /// The wait was cancelled before the deadline; `elapsed` is the time
    /// spent armed.
    Cancelled { elapsed: Duration },
}

impl WaitOutcome {
    pub fn elapsed(&self) -> Duration {
        match self {
            WaitOutcome::Fired { elapsed } | WaitOutcome::Cancelled { elapsed } => *elapsed,
        }
    }

    pub fn fired(&self) -> bool {
        matches!(self, WaitOutcome::Fired { .. })
    }
}

/// Passed to a repeat callback when the schedule is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatReport {
    /// Task executions completed by this arming.
    pub ticks: u64,
    /// Time spent armed, measured from the most recent cadence origin.
    pub elapsed: Duration,
}

/// Which tick chain a host thunk should re-enter.
#[derive(Debug, Clone, Copy)]
enum Chain {
    Wait,
    Repeat,
}

/// A sub-millisecond-accurate task scheduler on top of a host whose native
/// timer only guarantees millisecond-scale accuracy.
///
/// One instance owns one independent one-shot (wait) schedule and one
/// independent repeating schedule. Accuracy comes from a hybrid strategy:
/// while the remaining time exceeds the precision threshold the engine
/// defers once to the host's coarse timer, then spins the final window on
/// the host's cooperative yield queue, re-checking a high-resolution clock
/// on every hop. CPU is only traded for accuracy inside that last window.
///
/// ```
/// use std::rc::Rc;
/// use nanotick::{EventLoop, PrecisionTimer};
///
/// let host = Rc::new(EventLoop::new());
/// let timer = PrecisionTimer::new(Rc::clone(&host));
/// timer.wait(|| println!("fired"), "5m")?;
/// host.run_until_idle();
/// # Ok::<(), nanotick::TimerError>(())
/// ```
pub struct PrecisionTimer<H: Host> {
    pub(crate) host: Rc<H>,
    pub(crate) config: Config,
    core: Rc<RefCell<Core>>,
}

// Clones share the same schedule state; a task cancels its own timer by
// capturing a clone.
impl<H: Host> Clone for PrecisionTimer<H> {
    fn clone(&self) -> Self {
        Self {
            host: Rc::clone(&self.host),
            config: self.config,
            core: Rc::clone(&self.core),
        }
    }
}

impl<H: Host + 'static> PrecisionTimer<H> {
    /// A timer with the default 25ms precision threshold.
    pub fn new(host: Rc<H>) -> Self {
        Self::with_config(host, Config::default())
    }

    pub fn builder() -> Builder {
        Builder::new()
    }

    pub(crate) fn with_config(host: Rc<H>, config: Config) -> Self {
        Self {
            host,
            config,
            core: Rc::new(RefCell::new(Core::default())),
        }
    }

    /// Arms a one-shot delay. The task runs once, no earlier than `delay`
    /// past this call. Replaces any wait already armed on this instance.
    ///
    /// `delay` uses the duration grammar: an integer followed by `s`, `m`,
    /// `u` or `n` (e.g. `"50m"`), or a bare integer of milliseconds.
    pub fn wait<F, D>(&self, task: F, delay: D) -> Result<(), TimerError>
    where
        F: FnOnce() + 'static,
        D: IntoNanos,
    {
        let target = delay.into_nanos()?;
        self.arm_wait(Box::new(task), target, None);
        Ok(())
    }

    /// Like [`wait`](Self::wait), with a completion callback that receives
    /// a [`WaitOutcome`] when the wait fires or is cancelled.
    pub fn wait_with<F, D, C>(&self, task: F, delay: D, callback: C) -> Result<(), TimerError>
    where
        F: FnOnce() + 'static,
        D: IntoNanos,
        C: FnOnce(WaitOutcome) + 'static,
    {
        let target = delay.into_nanos()?;
        self.arm_wait(Box::new(task), target, Some(Box::new(callback)));
        Ok(())
    }

    /// Arms a repeating schedule: the task runs once per `interval`, ticks
    /// counted from the arming instant so task duration does not drift the
    /// cadence. An interval of zero runs the task on every cooperative
    /// tick until cancelled. Replaces any repeat already armed.
    pub fn repeat<F, D>(&self, task: F, interval: D) -> Result<(), TimerError>
    where
        F: FnMut() + 'static,
        D: IntoNanos,
    {
        let target = interval.into_nanos()?;
        self.arm_repeat(Box::new(task), target, None);
        Ok(())
    }

    /// Like [`repeat`](Self::repeat), with a callback invoked once when
    /// the schedule is cancelled, receiving a [`RepeatReport`].
    pub fn repeat_with<F, D, C>(&self, task: F, interval: D, callback: C) -> Result<(), TimerError>
    where
        F: FnMut() + 'static,
        D: IntoNanos,
        C: FnOnce(RepeatReport) + 'static,
    {
        let target = interval.into_nanos()?;
        self.arm_repeat(Box::new(task), target, Some(Box::new(callback)));
        Ok(())
    }

    /// One-shot convenience: a fresh default-configured timer, already
    /// armed.
    pub fn spawn_wait<F, D>(host: Rc<H>, task: F, delay: D) -> Result<Self, TimerError>
    where
        F: FnOnce() + 'static,
        D: IntoNanos,
    {
        let timer = Self::new(host);
        timer.wait(task, delay)?;
        Ok(timer)
    }

    /// Repeating convenience: a fresh default-configured timer, already
    /// armed.
    pub fn spawn_repeat<F, D>(host: Rc<H>, task: F, interval: D) -> Result<Self, TimerError>
    where
        F: FnMut() + 'static,
        D: IntoNanos,
    {
        let timer = Self::new(host);
        timer.repeat(task, interval)?;
        Ok(timer)
    }

    /// Cancels the armed wait, if any. Outstanding host registrations are
    /// cancelled and the callback, if one was registered, still runs with
    /// the elapsed wait so far. A wait that already fired, or was never
    /// armed, is a no-op with no callback; calling this twice is safe.
    pub fn cancel_wait(&self) {
        let (callback, elapsed) = {
            let mut core = self.core.borrow_mut();
            let wait = &mut core.wait;
            if wait.fired {
                return;
            }
            let Some(origin) = wait.origin.take() else {
                return;
            };
            self.release(&mut wait.reg);
            wait.task = None;
            (wait.callback.take(), self.now_ns().saturating_sub(origin))
        };

        if let Some(callback) = callback {
            callback(WaitOutcome::Cancelled {
                elapsed: Duration::from_nanos(elapsed),
            });
        }
    }

    /// Cancels the repeating schedule, if any. Safe to call from within
    /// the task itself: the current execution completes and no further
    /// tick is scheduled. The callback, if registered, still runs with the
    /// tick count and elapsed time. Never-armed is a no-op; idempotent.
    pub fn cancel_repeat(&self) {
        let (callback, report) = {
            let mut core = self.core.borrow_mut();
            let repeat = &mut core.repeat;
            let Some(origin) = repeat.origin.take() else {
                return;
            };
            self.release(&mut repeat.reg);
            repeat.task = None;
            repeat.epoch += 1;
            let report = RepeatReport {
                ticks: repeat.fired_ticks,
                elapsed: Duration::from_nanos(self.now_ns().saturating_sub(origin)),
            };
            repeat.ticks = 1;
            repeat.fired_ticks = 0;
            (repeat.callback.take(), report)
        };

        if let Some(callback) = callback {
            callback(report);
        }
    }

    /// Cancels both sub-states.
    pub fn cancel_all(&self) {
        self.cancel_wait();
        self.cancel_repeat();
    }

    pub fn is_waiting(&self) -> bool {
        self.core.borrow().wait.origin.is_some()
    }

    pub fn is_repeating(&self) -> bool {
        self.core.borrow().repeat.origin.is_some()
    }

    fn arm_wait(&self, task: WaitTask, target: u64, callback: Option<WaitCallback>) {
        {
            let mut core = self.core.borrow_mut();
            let wait = &mut core.wait;
            self.release(&mut wait.reg);
            wait.origin = None;
            wait.fired = false;
            wait.target = target;
            wait.task = Some(task);
            wait.callback = callback;
        }
        self.tick_wait();
    }

    fn arm_repeat(&self, task: RepeatTask, target: u64, callback: Option<RepeatCallback>) {
        {
            let mut core = self.core.borrow_mut();
            let repeat = &mut core.repeat;
            self.release(&mut repeat.reg);
            repeat.origin = None;
            repeat.target = target;
            repeat.ticks = 1;
            repeat.fired_ticks = 0;
            repeat.epoch += 1;
            repeat.task = Some(task);
            repeat.callback = callback;
        }
        self.tick_repeat();
    }

    /// One entry of the wait machine. Driven synchronously by the arming
    /// call, then by whichever host registration fires next.
    fn tick_wait(&self) {
        let mut core = self.core.borrow_mut();
        let wait = &mut core.wait;
        if wait.task.is_none() {
            // Cancelled between registration and dispatch.
            return;
        }
        wait.reg.coarse = None;
        wait.reg.yielded = None;

        let now = self.now_ns();
        let origin = *wait.origin.get_or_insert(now);
        let elapsed = now.saturating_sub(origin);

        if elapsed >= wait.target {
            wait.fired = true;
            wait.origin = None;
            wait.reg.deferred = false;
            let task = wait.task.take();
            let callback = wait.callback.take();
            if self.config.logging {
                tracing::debug!(elapsed_ns = elapsed, "actual wait");
            }
            drop(core);

            if let Some(task) = task {
                task();
            }
            if let Some(callback) = callback {
                callback(WaitOutcome::Fired {
                    elapsed: Duration::from_nanos(elapsed),
                });
            }
        } else {
            let remaining = wait.target - elapsed;
            self.requeue(&mut wait.reg, remaining, Chain::Wait);
        }
    }

    /// One entry of the repeat machine.
    fn tick_repeat(&self) {
        let mut core = self.core.borrow_mut();
        let repeat = &mut core.repeat;
        if repeat.task.is_none() {
            return;
        }
        repeat.reg.coarse = None;
        repeat.reg.yielded = None;

        let now = self.now_ns();

        // Zero interval: run as fast as the host allows, no elapsed or
        // threshold computation at all.
        if repeat.target == 0 {
            repeat.origin.get_or_insert(now);
            drop(core);
            self.run_repeat_task();
            return;
        }

        let mut origin = *repeat.origin.get_or_insert(now);

        // Rebase before `target * ticks` can cross the ceiling. Cadence
        // error propagates only across this boundary.
        if repeat
            .target
            .checked_mul(repeat.ticks)
            .is_none_or(|due| due > self.config.overflow_ceiling)
        {
            repeat.origin = Some(now);
            repeat.ticks = 1;
            origin = now;
        }

        let due_at = repeat.target.saturating_mul(repeat.ticks);
        let elapsed = now.saturating_sub(origin);

        if elapsed < due_at {
            let remaining = due_at - elapsed;
            self.requeue(&mut repeat.reg, remaining, Chain::Repeat);
        } else {
            if self.config.logging {
                tracing::debug!(elapsed_ns = elapsed, "cycle time");
            }
            drop(core);
            self.run_repeat_task();
        }
    }

    /// Runs the repeat task outside the state borrow so it can re-enter
    /// this timer, then reschedules if this arming is still the live one.
    fn run_repeat_task(&self) {
        let (mut task, epoch) = {
            let mut core = self.core.borrow_mut();
            let repeat = &mut core.repeat;
            let Some(task) = repeat.task.take() else {
                return;
            };
            repeat.fired_ticks += 1;
            (task, repeat.epoch)
        };

        task();

        let mut core = self.core.borrow_mut();
        let repeat = &mut core.repeat;
        // The task may have cancelled or re-armed this schedule; only the
        // surviving chain reschedules.
        if repeat.epoch != epoch || repeat.origin.is_none() {
            return;
        }
        repeat.ticks += 1;
        repeat.reg.deferred = false;
        repeat.task = Some(task);
        repeat.reg.yielded = Some(self.host.schedule_yield(self.chain_thunk(Chain::Repeat)));
    }

    /// The hybrid decision, identical for both machines. The first
    /// above-threshold deferral of an arming covers all but the precision
    /// window with a single coarse timer; every re-entry after that spins
    /// on the yield queue instead of re-arming redundant coarse timers.
    fn requeue(&self, reg: &mut Registration, remaining: u64, chain: Chain) {
        if remaining > self.config.precision && !reg.deferred {
            reg.deferred = true;
            let delay = Duration::from_nanos(remaining - self.config.precision);
            reg.coarse = Some(self.host.schedule_coarse(delay, self.chain_thunk(chain)));
        } else {
            reg.coarse = None;
            reg.yielded = Some(self.host.schedule_yield(self.chain_thunk(chain)));
        }
    }

    fn chain_thunk(&self, chain: Chain) -> Thunk {
        let timer = self.clone();
        Box::new(move || match chain {
            Chain::Wait => timer.tick_wait(),
            Chain::Repeat => timer.tick_repeat(),
        })
    }

    fn release(&self, reg: &mut Registration) {
        if let Some(handle) = reg.coarse.take() {
            self.host.cancel_coarse(handle);
        }
        if let Some(handle) = reg.yielded.take() {
            self.host.cancel_yield(handle);
        }
        reg.deferred = false;
    }

    pub(crate) fn now_ns(&self) -> u64 {
        self.host.now().as_nanos() as u64
    }

    #[cfg(test)]
    pub(crate) fn repeat_ticks(&self) -> u64 {
        self.core.borrow().repeat.ticks
    }
}
