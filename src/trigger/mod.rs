//! # Suspension Oracle
//!
//! The engine never decides *why* a traversal has to stop. It samples an
//! oracle at bounded intervals and reacts to what it answers:
//!
//! - [`Signal::Proceed`]: keep going
//! - [`Signal::Suspend`]: yield now, the traversal will be re-entered and must
//!   resume exactly where it stopped
//! - [`Signal::Break`]: forward progress is void (e.g. the underlying data
//!   changed); the pass has to be restarted from `reset()`
//!
//! The oracle is also told when a counter made progress, so that it can reset
//! stall detection or refuse to suspend before anything was achieved.

mod suspend_trigger;

pub use suspend_trigger::{SuspendBlocker, SuspendTrigger};

/// Answer of a [`SuspendOracle`] poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Proceed,
    Suspend,
    Break,
}

impl Signal {
    /// True for both `Suspend` and `Break`.
    pub fn must_stop(self) -> bool {
        !matches!(self, Signal::Proceed)
    }
}

/// External decision source for suspend/break requests.
///
/// Methods take `&self`; implementations keep their state in `Cell`s since a
/// traversal and its oracle live on one thread.
pub trait SuspendOracle {
    /// Has a suspend or break been requested?
    fn poll(&self) -> Signal;

    /// Forward progress just occurred.
    fn mark_progress(&self);
}

/// Oracle that never interrupts anything. Used when no oracle is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverSuspend;

impl SuspendOracle for NeverSuspend {
    fn poll(&self) -> Signal {
        Signal::Proceed
    }

    fn mark_progress(&self) {}
}
