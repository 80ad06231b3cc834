use crate::host::{Host, HostHandle, Thunk};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

const DEFAULT_YIELD_LATENCY: Duration = Duration::from_micros(10);

/// Safety fuse for [`FakeHost::run_until_idle`].
const MAX_STEPS: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Method {
    ScheduleCoarse,
    CancelCoarse,
    ScheduleYield,
    CancelYield,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    ScheduleCoarse { delay: Duration },
    CancelCoarse { handle: HostHandle },
    ScheduleYield,
    CancelYield { handle: HostHandle },
}

/// Deterministic [`Host`] with a manually advanced clock.
///
/// Yield dispatch advances the clock by a configurable per-hop latency, so
/// a spinning timer observes time passing exactly as fast as the pump
/// drives it. Every registration and cancellation is recorded for
/// assertion.
pub(crate) struct FakeHost {
    now: Cell<u64>,
    yield_latency: Cell<u64>,
    inner: RefCell<Inner>,
    calls: RefCell<HashMap<Method, Vec<Call>>>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    yields: VecDeque<(HostHandle, Thunk)>,
    coarse: Vec<CoarseEntry>,
}

struct CoarseEntry {
    handle: HostHandle,
    deadline: u64,
    thunk: Thunk,
}

impl Inner {
    fn next_handle(&mut self) -> HostHandle {
        self.next_id += 1;
        HostHandle(self.next_id)
    }

    fn earliest_coarse_index(&self) -> Option<usize> {
        self.coarse
            .iter()
            .enumerate()
            .min_by_key(|(_, entry)| (entry.deadline, entry.handle.0))
            .map(|(index, _)| index)
    }
}

impl FakeHost {
    pub(crate) fn new() -> Rc<Self> {
        Self::with_yield_latency(DEFAULT_YIELD_LATENCY)
    }

    pub(crate) fn with_yield_latency(latency: Duration) -> Rc<Self> {
        Rc::new(Self {
            now: Cell::new(0),
            yield_latency: Cell::new(latency.as_nanos() as u64),
            inner: RefCell::new(Inner::default()),
            calls: RefCell::new(HashMap::new()),
        })
    }

    pub(crate) fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by.as_nanos() as u64);
    }

    /// Runs one pending registration: a due coarse entry first, otherwise
    /// the oldest yield (advancing the clock by the hop latency). Returns
    /// false once nothing is runnable at the current clock.
    pub(crate) fn run_one(&self) -> bool {
        if let Some(thunk) = self.pop_due_coarse() {
            thunk();
            return true;
        }
        let next = self.inner.borrow_mut().yields.pop_front();
        if let Some((_, thunk)) = next {
            self.advance(Duration::from_nanos(self.yield_latency.get()));
            thunk();
            return true;
        }
        false
    }

    /// Drains the schedule, jumping the clock to future coarse deadlines
    /// when nothing else is runnable. Panics if it never settles.
    pub(crate) fn run_until_idle(&self) {
        for _ in 0..MAX_STEPS {
            if self.run_one() {
                continue;
            }
            let next_deadline = {
                let inner = self.inner.borrow();
                inner
                    .earliest_coarse_index()
                    .map(|index| inner.coarse[index].deadline)
            };
            match next_deadline {
                Some(deadline) => self.now.set(self.now.get().max(deadline)),
                None => return,
            }
        }
        panic!("fake host did not settle within {MAX_STEPS} steps");
    }

    /// Dispatches the earliest pending coarse entry without advancing the
    /// clock, like a host whose timer fires before its deadline.
    pub(crate) fn fire_coarse_early(&self) -> bool {
        let entry = {
            let mut inner = self.inner.borrow_mut();
            inner.earliest_coarse_index().map(|i| inner.coarse.remove(i))
        };
        match entry {
            Some(entry) => {
                (entry.thunk)();
                true
            }
            None => false,
        }
    }

    pub(crate) fn num_calls(&self, method: Method) -> usize {
        self.calls
            .borrow()
            .get(&method)
            .map_or(0, |calls| calls.len())
    }

    pub(crate) fn get_calls(&self, method: Method) -> Vec<Call> {
        self.calls
            .borrow()
            .get(&method)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, method: Method, call: Call) {
        self.calls.borrow_mut().entry(method).or_default().push(call);
    }

    fn pop_due_coarse(&self) -> Option<Thunk> {
        let mut inner = self.inner.borrow_mut();
        let now = self.now.get();
        let index = inner.earliest_coarse_index()?;
        if inner.coarse[index].deadline > now {
            return None;
        }
        Some(inner.coarse.remove(index).thunk)
    }
}

impl Host for FakeHost {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now.get())
    }

    fn schedule_coarse(&self, delay: Duration, thunk: Thunk) -> HostHandle {
        self.record(Method::ScheduleCoarse, Call::ScheduleCoarse { delay });
        let mut inner = self.inner.borrow_mut();
        let handle = inner.next_handle();
        let deadline = self.now.get() + delay.as_nanos() as u64;
        inner.coarse.push(CoarseEntry {
            handle,
            deadline,
            thunk,
        });
        handle
    }

    fn cancel_coarse(&self, handle: HostHandle) {
        self.record(Method::CancelCoarse, Call::CancelCoarse { handle });
        self.inner
            .borrow_mut()
            .coarse
            .retain(|entry| entry.handle != handle);
    }

    fn schedule_yield(&self, thunk: Thunk) -> HostHandle {
        self.record(Method::ScheduleYield, Call::ScheduleYield);
        let mut inner = self.inner.borrow_mut();
        let handle = inner.next_handle();
        inner.yields.push_back((handle, thunk));
        handle
    }

    fn cancel_yield(&self, handle: HostHandle) {
        self.record(Method::CancelYield, Call::CancelYield { handle });
        self.inner
            .borrow_mut()
            .yields
            .retain(|(pending, _)| *pending != handle);
    }
}
