//! Latching suspend trigger
//!
//! Suspension is requested explicitly (`request_suspend`) or by an expired
//! time budget. Once a poll answered `Suspend`, every later poll does too until
//! `resume()`: all nesting levels of the traversal see the same answer while
//! they unwind.
//!
//! A break request survives `resume()` and is consumed by the poll that
//! reports it.

use std::cell::Cell;
use std::time::{Duration, Instant};

use super::{Signal, SuspendOracle};
use crate::config::TriggerConfig;

#[derive(Debug)]
pub struct SuspendTrigger {
    budget: Option<Duration>,
    require_progress: bool,
    deadline: Cell<Option<Instant>>,
    suspend_requested: Cell<bool>,
    break_requested: Cell<bool>,
    progress_made: Cell<bool>,
    did_suspend: Cell<bool>,
    block_level: Cell<u32>,
    polls: Cell<u64>,
}

impl Default for SuspendTrigger {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SuspendTrigger {
    /// Create a trigger with an optional time budget per resumption.
    pub fn new(budget: Option<Duration>) -> Self {
        Self {
            budget,
            require_progress: true,
            deadline: Cell::new(budget.map(|b| Instant::now() + b)),
            suspend_requested: Cell::new(false),
            break_requested: Cell::new(false),
            progress_made: Cell::new(false),
            did_suspend: Cell::new(false),
            block_level: Cell::new(0),
            polls: Cell::new(0),
        }
    }

    pub fn from_config(cfg: &TriggerConfig) -> Self {
        let mut trigger = Self::new(cfg.budget());
        trigger.require_progress = cfg.require_progress;
        trigger
    }

    /// Allow suspension before any progress was marked.
    pub fn without_progress_gate(mut self) -> Self {
        self.require_progress = false;
        self
    }

    /// Ask the running traversal to yield at its next check.
    pub fn request_suspend(&self) {
        self.suspend_requested.set(true);
    }

    /// Ask the next poll to abandon the pass.
    pub fn request_break(&self) {
        self.break_requested.set(true);
    }

    /// Clear the suspend state and restart the time budget. Call before
    /// re-entering a suspended traversal.
    pub fn resume(&self) {
        self.did_suspend.set(false);
        self.progress_made.set(false);
        self.suspend_requested.set(false);
        self.deadline.set(self.budget.map(|b| Instant::now() + b));
    }

    /// Whether a poll answered `Suspend` since the last `resume()`.
    pub fn did_suspend(&self) -> bool {
        !self.is_blocked() && self.did_suspend.get()
    }

    pub fn is_blocked(&self) -> bool {
        self.block_level.get() > 0
    }

    /// Suppress suspension until the returned guard is dropped.
    pub fn block(&self) -> SuspendBlocker<'_> {
        self.block_level.set(self.block_level.get() + 1);
        SuspendBlocker { trigger: self }
    }

    /// Number of polls answered so far.
    pub fn polls(&self) -> u64 {
        self.polls.get()
    }

    fn budget_expired(&self) -> bool {
        self.deadline
            .get()
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

impl SuspendOracle for SuspendTrigger {
    fn poll(&self) -> Signal {
        self.polls.set(self.polls.get() + 1);

        if self.is_blocked() {
            return Signal::Proceed;
        }
        if self.break_requested.replace(false) {
            return Signal::Break;
        }
        if self.did_suspend.get() {
            return Signal::Suspend;
        }
        if self.require_progress && !self.progress_made.get() {
            return Signal::Proceed;
        }
        if self.suspend_requested.replace(false) || self.budget_expired() {
            self.did_suspend.set(true);
            return Signal::Suspend;
        }
        Signal::Proceed
    }

    fn mark_progress(&self) {
        if !self.is_blocked() {
            self.progress_made.set(true);
        }
    }
}

/// Guard returned by [`SuspendTrigger::block`].
#[must_use = "suspension is only blocked while the guard is alive"]
#[derive(Debug)]
pub struct SuspendBlocker<'a> {
    trigger: &'a SuspendTrigger,
}

impl Drop for SuspendBlocker<'_> {
    fn drop(&mut self) {
        let level = self.trigger.block_level.get();
        debug_assert!(level > 0);
        self.trigger.block_level.set(level.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_waits_for_progress() {
        let trigger = SuspendTrigger::new(None);
        trigger.request_suspend();

        assert_eq!(trigger.poll(), Signal::Proceed);
        trigger.mark_progress();
        assert_eq!(trigger.poll(), Signal::Suspend);
        assert!(trigger.did_suspend());
    }

    #[test]
    fn test_suspend_is_sticky_until_resume() {
        let trigger = SuspendTrigger::new(None).without_progress_gate();
        trigger.request_suspend();

        assert_eq!(trigger.poll(), Signal::Suspend);
        assert_eq!(trigger.poll(), Signal::Suspend);

        trigger.resume();
        assert!(!trigger.did_suspend());
        assert_eq!(trigger.poll(), Signal::Proceed);
        assert_eq!(trigger.polls(), 3);
    }

    #[test]
    fn test_break_ignores_progress_gate() {
        let trigger = SuspendTrigger::new(None);
        trigger.request_break();
        assert_eq!(trigger.poll(), Signal::Break);
        assert!(!trigger.did_suspend());
    }

    #[test]
    fn test_break_survives_resume_and_is_consumed() {
        let trigger = SuspendTrigger::new(None);
        trigger.request_break();
        trigger.resume();
        assert_eq!(trigger.poll(), Signal::Break);
        assert_eq!(trigger.poll(), Signal::Proceed);
    }

    #[test]
    fn test_blocker_suppresses_and_nests() {
        let trigger = SuspendTrigger::new(None).without_progress_gate();
        trigger.request_suspend();
        {
            let _outer = trigger.block();
            {
                let _inner = trigger.block();
                assert_eq!(trigger.poll(), Signal::Proceed);
            }
            assert_eq!(trigger.poll(), Signal::Proceed);
            trigger.mark_progress();
        }
        assert_eq!(trigger.poll(), Signal::Suspend);
    }

    #[test]
    fn test_progress_marked_while_blocked_does_not_count() {
        let trigger = SuspendTrigger::new(None);
        trigger.request_suspend();
        {
            let _guard = trigger.block();
            trigger.mark_progress();
        }
        assert_eq!(trigger.poll(), Signal::Proceed);
    }

    #[test]
    fn test_expired_budget_suspends() {
        let trigger = SuspendTrigger::new(Some(Duration::ZERO));
        assert_eq!(trigger.poll(), Signal::Proceed);
        trigger.mark_progress();
        assert_eq!(trigger.poll(), Signal::Suspend);
    }

    #[test]
    fn test_generous_budget_does_not_suspend() {
        let trigger = SuspendTrigger::new(Some(Duration::from_secs(3600)));
        trigger.mark_progress();
        assert_eq!(trigger.poll(), Signal::Proceed);
    }

    #[test]
    fn test_from_config() {
        let cfg = TriggerConfig {
            budget_ms: Some(0),
            require_progress: false,
        };
        let trigger = SuspendTrigger::from_config(&cfg);
        assert_eq!(trigger.poll(), Signal::Suspend);
    }
}
