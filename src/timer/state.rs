use crate::host::HostHandle;
use crate::timer::timer::{RepeatReport, WaitOutcome};

pub(crate) type WaitTask = Box<dyn FnOnce()>;
pub(crate) type RepeatTask = Box<dyn FnMut()>;
pub(crate) type WaitCallback = Box<dyn FnOnce(WaitOutcome)>;
pub(crate) type RepeatCallback = Box<dyn FnOnce(RepeatReport)>;

/// Pending host registrations for one sub-state. At most one of `coarse`
/// and `yielded` is live at a time; every tick entry clears the spent slot
/// before registering the next one, so no two re-entries for the same
/// sub-state are ever pending simultaneously.
#[derive(Default)]
pub(crate) struct Registration {
    /// Whether this arming has already spent its single coarse deferral.
    pub(crate) deferred: bool,
    pub(crate) coarse: Option<HostHandle>,
    pub(crate) yielded: Option<HostHandle>,
}

#[derive(Default)]
pub(crate) struct WaitState {
    /// Host time at arming; `Some` iff a wait is armed.
    pub(crate) origin: Option<u64>,
    pub(crate) target: u64,
    /// Set when the deadline fires, so a cancel issued from the task or
    /// its callback is a no-op.
    pub(crate) fired: bool,
    pub(crate) reg: Registration,
    pub(crate) task: Option<WaitTask>,
    pub(crate) callback: Option<WaitCallback>,
}

pub(crate) struct RepeatState {
    /// Host time the cadence is anchored to; `Some` iff repeating.
    pub(crate) origin: Option<u64>,
    pub(crate) target: u64,
    /// Cadence counter: the next tick is due at `target * ticks` past the
    /// origin. Resets to 1 on clear, re-arm, and overflow rebase.
    pub(crate) ticks: u64,
    /// Total task executions for this arming, stable across rebases.
    pub(crate) fired_ticks: u64,
    /// Arming generation. Bumped on every arm and cancel so a tick chain
    /// can tell whether the task it just ran cancelled or replaced it.
    pub(crate) epoch: u64,
    pub(crate) reg: Registration,
    pub(crate) task: Option<RepeatTask>,
    pub(crate) callback: Option<RepeatCallback>,
}

impl Default for RepeatState {
    fn default() -> Self {
        Self {
            origin: None,
            target: 0,
            ticks: 1,
            fired_ticks: 0,
            epoch: 0,
            reg: Registration::default(),
            task: None,
            callback: None,
        }
    }
}

/// Mutable state of one [`crate::PrecisionTimer`]. The wait and repeat
/// machines are independent and may run concurrently within one instance.
#[derive(Default)]
pub(crate) struct Core {
    pub(crate) wait: WaitState,
    pub(crate) repeat: RepeatState,
}
