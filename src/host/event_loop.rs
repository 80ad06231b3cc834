use crate::host::{Host, HostHandle, Thunk};
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::thread;
use std::time::{Duration, Instant};

/// A single-threaded cooperative driver for timers that have no other
/// runtime to live on.
///
/// Yield registrations run in FIFO order. Coarse registrations sit in a
/// deadline-ordered heap and run once the clock passes them; when nothing
/// is runnable the loop sleeps via [`thread::sleep`] until the earliest
/// deadline. That sleep is exactly the imprecise primitive the timer
/// engine compensates for.
pub struct EventLoop {
    started: Instant,
    inner: RefCell<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    yields: VecDeque<YieldEntry>,
    coarse: BinaryHeap<Reverse<CoarseEntry>>,
    cancelled: HashSet<HostHandle>,
}

impl Inner {
    fn next_handle(&mut self) -> HostHandle {
        self.next_id += 1;
        HostHandle(self.next_id)
    }
}

struct YieldEntry {
    handle: HostHandle,
    thunk: Thunk,
}

struct CoarseEntry {
    deadline: Duration,
    handle: HostHandle,
    thunk: Thunk,
}

impl PartialEq for CoarseEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.handle == other.handle
    }
}

impl Eq for CoarseEntry {}

impl PartialOrd for CoarseEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CoarseEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then_with(|| self.handle.0.cmp(&other.handle.0))
    }
}

enum Step {
    Run(Thunk),
    Sleep(Duration),
    Idle,
}

impl EventLoop {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            inner: RefCell::new(Inner::default()),
        }
    }

    /// Dispatches registrations until none remain, then returns.
    ///
    /// A zero-interval repeat keeps the loop busy forever; it has to be
    /// cancelled from within one of its own ticks for the loop to settle.
    pub fn run_until_idle(&self) {
        loop {
            match self.next_step() {
                Step::Run(thunk) => thunk(),
                Step::Sleep(remaining) => thread::sleep(remaining),
                Step::Idle => break,
            }
        }
    }

    fn next_step(&self) -> Step {
        let mut inner = self.inner.borrow_mut();
        let now = self.started.elapsed();
        let Inner {
            yields,
            coarse,
            cancelled,
            ..
        } = &mut *inner;

        // Due coarse entries run before yields: a timer spinning on the
        // yield queue must not starve another schedule's deadline.
        while let Some(Reverse(top)) = coarse.peek() {
            if cancelled.remove(&top.handle) {
                coarse.pop();
                continue;
            }
            if top.deadline > now {
                break;
            }
            if let Some(Reverse(entry)) = coarse.pop() {
                return Step::Run(entry.thunk);
            }
        }

        while let Some(entry) = yields.pop_front() {
            if cancelled.remove(&entry.handle) {
                continue;
            }
            return Step::Run(entry.thunk);
        }

        if let Some(Reverse(top)) = coarse.peek() {
            return Step::Sleep(top.deadline.saturating_sub(now));
        }

        Step::Idle
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for EventLoop {
    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    fn schedule_coarse(&self, delay: Duration, thunk: Thunk) -> HostHandle {
        let deadline = self.started.elapsed() + delay;
        let mut inner = self.inner.borrow_mut();
        let handle = inner.next_handle();
        inner.coarse.push(Reverse(CoarseEntry {
            deadline,
            handle,
            thunk,
        }));
        handle
    }

    fn cancel_coarse(&self, handle: HostHandle) {
        self.inner.borrow_mut().cancelled.insert(handle);
    }

    fn schedule_yield(&self, thunk: Thunk) -> HostHandle {
        let mut inner = self.inner.borrow_mut();
        let handle = inner.next_handle();
        inner.yields.push_back(YieldEntry { handle, thunk });
        handle
    }

    fn cancel_yield(&self, handle: HostHandle) {
        self.inner.borrow_mut().cancelled.insert(handle);
    }
}
