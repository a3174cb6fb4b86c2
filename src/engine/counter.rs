//! Resumable counter
//!
//! A `ResumableCounter` is the loop variable of one nesting level. Opening it
//! claims the next slot of its [`CounterStacks`]: on a fresh pass the counter
//! starts at 0, on a re-entered pass it starts at the value it had when the
//! traversal was suspended. Loops therefore iterate from `value()` instead of
//! from 0:
//!
//! ```
//! use resumable_core::{CounterStacks, ResumableCounter};
//!
//! let mut stacks = CounterStacks::new();
//! stacks.reset(());
//!
//! let mut rows = ResumableCounter::open(&mut stacks, false).unwrap();
//! while rows.value() < 3 {
//!     let mut cells = rows.nest(true);
//!     while cells.value() < 4 {
//!         // draw cell (rows.value(), cells.value())
//!         if !cells.inc() {
//!             return; // suspended: dropping the counters records their values
//!         }
//!     }
//!     cells.close();
//!     if !rows.inc() {
//!         return;
//!     }
//! }
//! rows.close();
//! ```
//!
//! A nested counter borrows its parent exclusively, so the parent can neither
//! be advanced nor closed while the child is open:
//!
//! ```compile_fail
//! use resumable_core::{CounterStacks, ResumableCounter};
//!
//! let mut stacks = CounterStacks::new();
//! stacks.reset(());
//! let mut outer = ResumableCounter::open(&mut stacks, false).unwrap();
//! let inner = outer.nest(false);
//! outer.increment();
//! drop(inner);
//! ```

use std::fmt;

use super::stacks::{BreakCause, CounterId, CounterStacks};
use crate::error::{CounterError, EngineError};
use crate::trigger::Signal;

/// Sampling period of [`ResumableCounter::must_break_or_suspend_100`].
pub const SAMPLE_100: usize = 0x0080;
/// Sampling period of [`ResumableCounter::must_break_or_suspend_1000`].
pub const SAMPLE_1000: usize = 0x0400;
/// Sampling period of [`ResumableCounter::must_break_or_suspend_10000`].
pub const SAMPLE_10000: usize = 0x2000;

/// What a nested counter needs to know about its parent when it is opened.
struct Parent {
    id: CounterId,
    exhausted: bool,
    breaks: bool,
}

pub struct ResumableCounter<'s, P> {
    stacks: Option<&'s mut CounterStacks<P>>,
    value: usize,
    stop: usize,
    id: CounterId,
    prev: Option<CounterId>,
    mark_progress: bool,
}

impl<P> fmt::Debug for ResumableCounter<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumableCounter")
            .field("value", &self.value)
            .field("stop", &self.stop)
            .field("bound", &self.stacks.is_some())
            .field("mark_progress", &self.mark_progress)
            .finish()
    }
}

impl<'s, P> ResumableCounter<'s, P> {
    /* ===================== Construction ===================== */

    /// Open the outermost counter of a pass on `stacks`, or an ordinary
    /// counter without resumption when `stacks` is `None`.
    pub fn new(
        stacks: Option<&'s mut CounterStacks<P>>,
        mark_progress: bool,
    ) -> Result<Self, EngineError> {
        match stacks {
            Some(stacks) => Self::open(stacks, mark_progress),
            None => Ok(Self::detached()),
        }
    }

    /// Open the outermost counter of a pass.
    ///
    /// Fails when the stacks hold no frame, when the pass was broken and has
    /// not been reset or popped since, or when counters were leaked.
    pub fn open(stacks: &'s mut CounterStacks<P>, mark_progress: bool) -> Result<Self, EngineError> {
        if stacks.empty() {
            return Err(EngineError::NoFrame);
        }
        if stacks.did_break() {
            return Err(EngineError::PassBroken);
        }
        if !stacks.no_active_counters() {
            return Err(EngineError::CountersStillActive(stacks.nr_active_counters()));
        }
        Ok(Self::bind(stacks, None, mark_progress))
    }

    /// An ordinary counter that never suspends or breaks.
    pub fn detached() -> Self {
        Self {
            stacks: None,
            value: 0,
            stop: usize::MAX,
            id: CounterId::DETACHED,
            prev: None,
            mark_progress: false,
        }
    }

    /// Open the next nesting level. The returned counter borrows `self` until
    /// it is closed or dropped.
    pub fn nest(&mut self, mark_progress: bool) -> ResumableCounter<'_, P> {
        debug_assert!(self.is_active(), "nest() on a counter that is not current");

        let exhausted = self.value >= self.stop;
        let breaks = exhausted
            && self.stacks.as_deref().is_some_and(|s| !s.did_break())
            && self.must_break();
        let parent = Parent {
            id: self.id,
            exhausted,
            breaks,
        };

        match self.stacks.as_deref_mut() {
            Some(stacks) => ResumableCounter::bind(stacks, Some(parent), mark_progress),
            None => ResumableCounter::detached(),
        }
    }

    fn bind(stacks: &'s mut CounterStacks<P>, parent: Option<Parent>, mark_progress: bool) -> Self {
        let mut stop = usize::MAX;

        // Below an older pass the counter may only run up to where that pass
        // got: the same slot depth in the frame below.
        let limited = match &parent {
            Some(p) => p.exhausted && !p.breaks,
            None => stacks.has_multiple_stacks(),
        };
        if limited && !stacks.did_break() {
            match stacks.catch_up_stop() {
                Some(v) => stop = v,
                None => stacks.mark_break(BreakCause::CaughtUp),
            }
        }

        if stacks.exceeds_depth() {
            tracing::warn!(
                depth = stacks.nr_active_counters() + 1,
                max_depth = ?stacks.config().max_depth,
                "nesting exceeds max_depth; breaking pass"
            );
            stacks.mark_break(BreakCause::DepthExceeded);
        }

        let prev = stacks.curr_counter();
        debug_assert_eq!(prev, parent.as_ref().map(|p| p.id));

        let id = stacks.next_counter_id();
        let value = stacks.inc_level(0);
        stacks.set_curr_counter(id, prev);

        if stacks.did_break() {
            stop = value;
        }

        Self {
            stacks: Some(stacks),
            value,
            stop,
            id,
            prev,
            mark_progress,
        }
    }

    /* ===================== Value Access ===================== */

    pub fn value(&self) -> usize {
        self.value
    }

    /// The value at which this counter breaks its pass (`usize::MAX` when
    /// unlimited).
    pub fn stop_value(&self) -> usize {
        self.stop
    }

    pub fn is_exhausted(&self) -> bool {
        self.value >= self.stop
    }

    pub fn is_bound(&self) -> bool {
        self.stacks.is_some()
    }

    /// Whether this counter is the innermost open one of its stacks.
    pub fn is_active(&self) -> bool {
        match self.stacks.as_deref() {
            None => true,
            Some(stacks) => stacks.curr_counter() == Some(self.id),
        }
    }

    /// Jump forward to `new_value`. Moving past the current value discards
    /// slots stored below this level for the current item.
    pub fn set_value(&mut self, new_value: usize) -> Result<(), CounterError> {
        debug_assert!(self.is_active(), "set_value() on a counter that is not current");

        if new_value < self.value {
            return Err(CounterError::Regression {
                current: self.value,
                requested: new_value,
            });
        }
        if self.is_exhausted() {
            return Err(CounterError::Exhausted {
                value: self.value,
                stop: self.stop,
            });
        }
        if new_value > self.value {
            if let Some(stacks) = self.stacks.as_deref_mut() {
                stacks.erase_suspended();
            }
        }
        self.value = new_value;
        Ok(())
    }

    /// Advance by one, reporting progress to the oracle when asked to.
    pub fn increment(&mut self) {
        debug_assert!(self.is_active(), "increment() on a counter that is not current");
        debug_assert!(!self.is_exhausted(), "increment() past the stop value");

        self.value += 1;
        if let Some(stacks) = self.stacks.as_deref_mut() {
            stacks.erase_suspended();
            if self.mark_progress {
                stacks.oracle().mark_progress();
            }
        }
    }

    /// Advance by `n` without reporting progress. Saturates at `usize::MAX`.
    pub fn advance_by(&mut self, n: usize) {
        debug_assert!(self.is_active(), "advance_by() on a counter that is not current");
        debug_assert!(!self.is_exhausted(), "advance_by() past the stop value");

        self.value = self.value.saturating_add(n);
        if let Some(stacks) = self.stacks.as_deref_mut() {
            stacks.erase_suspended();
        }
    }

    /// Move to the next item. Returns false when the caller has to stop
    /// immediately: either the pass breaks before the increment, or a break or
    /// suspend was signalled after it.
    pub fn inc(&mut self) -> bool {
        if let Some(stacks) = self.stacks.as_deref_mut() {
            stacks.erase_suspended();
        }
        if self.must_break_next() {
            return false;
        }
        self.increment();
        !self.must_break_or_suspend()
    }

    /* ===================== Break / Suspend Checks ===================== */

    /// The pass must stop at the current value: it caught up with the frame
    /// below, or it was broken by other means.
    pub fn must_break(&mut self) -> bool {
        debug_assert!(self.is_active(), "must_break() on a counter that is not current");

        let Some(stacks) = self.stacks.as_deref_mut() else {
            return false;
        };
        if stacks.did_break() {
            return true;
        }
        if self.value < self.stop {
            return false;
        }

        let result = self.value > self.stop || stacks.has_breaking_stack_size();
        if result {
            stacks.mark_break(BreakCause::CaughtUp);
        }
        result
    }

    /// Would advancing to the next value already pass the stop value?
    pub fn must_break_next(&mut self) -> bool {
        debug_assert!(self.is_active(), "must_break_next() on a counter that is not current");

        let Some(stacks) = self.stacks.as_deref_mut() else {
            return false;
        };
        if stacks.did_break() {
            return true;
        }
        if self.value < self.stop {
            return false;
        }
        stacks.mark_break(BreakCause::CaughtUp);
        true
    }

    /// `must_break()`, or else ask the oracle.
    pub fn must_break_or_suspend(&mut self) -> bool {
        if self.must_break() {
            return true;
        }
        let Some(stacks) = self.stacks.as_deref_mut() else {
            return false;
        };
        let signal = stacks.oracle().poll();
        if signal == Signal::Break {
            stacks.mark_break(BreakCause::Requested);
        }
        signal.must_stop()
    }

    /// Check only when the value is a multiple of `period` (a power of two).
    pub fn must_break_or_suspend_every(&mut self, period: usize) -> bool {
        debug_assert!(period.is_power_of_two());
        self.value & (period - 1) == 0 && self.must_break_or_suspend()
    }

    /// Check on every 128th value.
    pub fn must_break_or_suspend_100(&mut self) -> bool {
        self.must_break_or_suspend_every(SAMPLE_100)
    }

    /// Check on every 1024th value.
    pub fn must_break_or_suspend_1000(&mut self) -> bool {
        self.must_break_or_suspend_every(SAMPLE_1000)
    }

    /// Check on every 8192nd value.
    pub fn must_break_or_suspend_10000(&mut self) -> bool {
        self.must_break_or_suspend_every(SAMPLE_10000)
    }

    /* ===================== Closing ===================== */

    /// The level ran to completion: release its slot.
    pub fn close(mut self) {
        debug_assert!(self.is_active(), "close() on a counter that is not current");

        if let Some(stacks) = self.stacks.take() {
            stacks.close_counter(self.prev);
        }
    }
}

impl<P> Drop for ResumableCounter<'_, P> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        let Some(stacks) = self.stacks.take() else {
            return;
        };
        debug_assert_eq!(
            stacks.curr_counter(),
            Some(self.id),
            "counters must be dropped in reverse order of opening"
        );

        if stacks.did_break() {
            stacks.close_counter(self.prev);
        } else {
            stacks.suspend(self.value, self.prev);
        }
    }
}
