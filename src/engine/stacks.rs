//! Checkpoint frame stack
//!
//! `CounterStacks` owns the flat slot array shared by every frame and the
//! bookkeeping for the counters currently open on it. The checkpoint of a
//! suspended traversal is nothing but the content of the slot array: counters
//! write their value into their slot when they are dropped without being
//! closed, and read it back when the traversal re-opens them.
//!
//! The most recently pushed frame is the least advanced pass. Counters opened
//! while older frames exist stop at the positions recorded by the frame below;
//! reaching that position breaks the pass, after which the caller pops the
//! frame and the older pass resumes.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use super::frame::CounterStack;
use crate::config::EngineConfig;
use crate::trigger::{NeverSuspend, SuspendOracle};

/// Identity of a [`ResumableCounter`](super::ResumableCounter) within its stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterId(u64);

impl CounterId {
    pub(crate) const DETACHED: CounterId = CounterId(0);
}

/// Why a pass was broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BreakCause {
    /// The pass reached the position recorded by the frame below it.
    CaughtUp,
    /// A counter was opened deeper than `max_depth`.
    DepthExceeded,
    /// The oracle answered `Break`.
    Requested,
}

/* ===================== CounterStacks ===================== */

pub struct CounterStacks<P> {
    pub(super) frames: Vec<CounterStack<P>>,
    pub(super) counters: Vec<usize>,
    pub(super) nr_active: usize,
    curr_counter: Option<CounterId>,
    next_id: u64,
    break_cause: Option<BreakCause>,
    config: EngineConfig,
    oracle: Rc<dyn SuspendOracle>,
}

impl<P> fmt::Debug for CounterStacks<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterStacks")
            .field("frames", &self.frames.len())
            .field("counters", &self.counters)
            .field("nr_active", &self.nr_active)
            .field("curr_counter", &self.curr_counter)
            .field("break_cause", &self.break_cause)
            .finish_non_exhaustive()
    }
}

impl<P> Default for CounterStacks<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> CounterStacks<P> {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_oracle(config, Rc::new(NeverSuspend))
    }

    pub fn with_oracle(config: EngineConfig, oracle: Rc<dyn SuspendOracle>) -> Self {
        Self {
            frames: Vec::with_capacity(config.frame_capacity),
            counters: Vec::new(),
            nr_active: 0,
            curr_counter: None,
            next_id: 1,
            break_cause: None,
            config,
            oracle,
        }
    }

    pub fn set_oracle(&mut self, oracle: Rc<dyn SuspendOracle>) {
        self.oracle = oracle;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn oracle(&self) -> &dyn SuspendOracle {
        self.oracle.as_ref()
    }

    /* ===================== Frame Management ===================== */

    /// Discard every frame and start a fresh pass over `payload`.
    pub fn reset(&mut self, payload: P) {
        if self.nr_active != 0 {
            tracing::warn!(
                nr_active = self.nr_active,
                "reset with leaked counters; discarding them"
            );
        }

        self.frames.clear();
        self.counters.clear();
        self.nr_active = 0;
        self.curr_counter = None;
        self.break_cause = None;
        self.frames.push(CounterStack::new(payload, 0));

        tracing::debug!("counter stacks reset");
        debug_assert!(self.is_ok());
    }

    /// Start a new, least advanced pass on top of the current one.
    pub fn add_draw_region(&mut self, payload: P) {
        debug_assert!(self.no_active_counters());
        debug_assert!(!self.did_break());

        if !self.frames.is_empty() {
            self.curr_stack_empty();
        }
        let stack_base = self.counters.len();
        self.frames.push(CounterStack::new(payload, stack_base));

        tracing::debug!(frames = self.frames.len(), stack_base, "frame pushed");
        debug_assert!(self.is_ok());
    }

    /// Remove the most recent (least advanced) frame and return its payload.
    pub fn pop_back(&mut self) -> Option<P> {
        debug_assert!(self.no_active_counters());

        if self.frames.is_empty() {
            return None;
        }
        self.erase_suspended();
        let frame = self.frames.pop()?;
        self.counters.truncate(frame.stack_base);
        self.break_cause = None;

        tracing::debug!(frames = self.frames.len(), "frame popped");
        debug_assert!(self.is_ok());
        Some(frame.payload)
    }

    /// Drop trailing zero slots of the current frame; they record no progress.
    /// Returns true when the current frame has no progress left at all.
    pub(super) fn curr_stack_empty(&mut self) -> bool {
        let base = self.curr_stack().stack_base;
        debug_assert!(base <= self.counters.len());

        while self.counters.len() > base {
            if self.counters.last() != Some(&0) {
                return false;
            }
            self.counters.pop();
        }
        true
    }

    /// Remove frame `idx` and every frame above it, with their slots.
    pub(super) fn cutoff_stacks(&mut self, idx: usize) {
        let base = self.frames[idx].stack_base;
        self.counters.truncate(base);
        self.frames.truncate(idx);
        tracing::debug!(frames = self.frames.len(), "frames cut off");
    }

    /* ===================== Observers ===================== */

    pub fn empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn has_multiple_stacks(&self) -> bool {
        self.frames.len() > 1
    }

    pub fn nr_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn did_break(&self) -> bool {
        self.break_cause.is_some()
    }

    pub fn break_cause(&self) -> Option<BreakCause> {
        self.break_cause
    }

    /// Whether the whole pass has been flagged as broken and must be
    /// restarted (or popped) rather than resumed.
    pub fn must_break(&self) -> bool {
        !self.frames.is_empty() && self.did_break()
    }

    pub fn nr_active_counters(&self) -> usize {
        self.nr_active
    }

    pub fn no_active_counters(&self) -> bool {
        self.nr_active == 0
    }

    /// No slot beyond the open counters of the current frame is left over
    /// from an earlier suspension.
    pub fn no_suspended_counters(&self) -> bool {
        match self.frames.last() {
            None => true,
            Some(frame) => frame.stack_base + self.nr_active >= self.counters.len(),
        }
    }

    pub fn curr_counter(&self) -> Option<CounterId> {
        self.curr_counter
    }

    pub fn curr_payload(&self) -> Option<&P> {
        self.frames.last().map(|f| &f.payload)
    }

    pub fn curr_payload_mut(&mut self) -> Option<&mut P> {
        self.frames.last_mut().map(|f| &mut f.payload)
    }

    /// Payloads from the oldest (most advanced) to the newest frame.
    pub fn payloads(&self) -> impl Iterator<Item = &P> {
        self.frames.iter().map(|f| &f.payload)
    }

    pub fn frames(&self) -> &[CounterStack<P>] {
        &self.frames
    }

    /// The slot array.
    pub fn slots(&self) -> &[usize] {
        &self.counters
    }

    pub fn snapshot(&self) -> StacksSnapshot {
        let frames = self
            .frames
            .iter()
            .enumerate()
            .map(|(i, frame)| {
                let end = self
                    .frames
                    .get(i + 1)
                    .map_or(self.counters.len(), |next| next.stack_base);
                FrameSnapshot {
                    stack_base: frame.stack_base,
                    slots: self.counters[frame.stack_base..end].to_vec(),
                }
            })
            .collect();

        StacksSnapshot {
            frames,
            nr_active: self.nr_active,
            break_cause: self.break_cause,
        }
    }

    pub(crate) fn curr_stack(&self) -> &CounterStack<P> {
        debug_assert!(!self.empty());
        &self.frames[self.frames.len() - 1]
    }

    pub(crate) fn next_stack(&self) -> &CounterStack<P> {
        debug_assert!(self.has_multiple_stacks());
        &self.frames[self.frames.len() - 2]
    }

    /* ===================== Counter Protocol ===================== */

    pub(crate) fn next_counter_id(&mut self) -> CounterId {
        let id = CounterId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Claim the slot of the next nesting level. Returns the value stored by
    /// an earlier suspension at that level, or `first_value` for a new level.
    pub(crate) fn inc_level(&mut self, first_value: usize) -> usize {
        let pos = self.curr_stack().stack_base + self.nr_active;

        let value = match self.counters.get(pos) {
            Some(&suspended) => suspended,
            None => {
                // suspend() must not reallocate while unwinding
                self.counters.reserve(pos + 1 - self.counters.len());
                first_value
            }
        };
        self.nr_active += 1;
        value
    }

    pub(crate) fn set_curr_counter(&mut self, curr: CounterId, prev: Option<CounterId>) {
        debug_assert_eq!(prev, self.curr_counter);
        self.curr_counter = Some(curr);
    }

    /// Store `value` in the slot of the innermost open level and make `prev`
    /// current again.
    pub(crate) fn suspend(&mut self, value: usize, prev: Option<CounterId>) {
        debug_assert!(self.nr_active > 0);
        debug_assert!(!self.did_break());

        self.nr_active -= 1;
        let pos = self.curr_stack().stack_base + self.nr_active;
        if self.counters.len() <= pos {
            self.counters.resize(pos + 1, value);
        } else {
            self.counters[pos] = value;
        }
        self.curr_counter = prev;

        tracing::trace!(level = self.nr_active, value, "counter suspended");
        debug_assert!(self.is_ok());
    }

    /// Release the innermost open level after it ran to completion (or after a
    /// break) and make `prev` current again.
    pub(crate) fn close_counter(&mut self, prev: Option<CounterId>) {
        debug_assert!(self.nr_active > 0);

        self.nr_active -= 1;
        self.erase_suspended();
        self.curr_counter = prev;

        tracing::trace!(level = self.nr_active, "counter closed");
        debug_assert!(self.no_suspended_counters());
    }

    /// Drop slots deeper than the open counters of the current frame. They
    /// are leftovers of an earlier suspension that will not be re-opened.
    pub fn erase_suspended(&mut self) {
        let Some(frame) = self.frames.last() else {
            return;
        };
        debug_assert!(self.counters.len() >= frame.stack_base);

        let end = frame.stack_base + self.nr_active;
        if self.counters.len() > end {
            self.counters.truncate(end);
        }
    }

    /// Stop value for the counter about to be opened: the slot recorded at the
    /// same depth by the frame below. `None` when that frame recorded nothing
    /// at this depth, i.e. the current pass has already caught up.
    pub(crate) fn catch_up_stop(&self) -> Option<usize> {
        let next = self.next_stack();
        let end = self.curr_stack().stack_base;
        let pos = next.stack_base + self.nr_active;
        if pos < end {
            Some(self.counters[pos])
        } else {
            None
        }
    }

    /// The frame below recorded exactly as many levels as are open now.
    pub(crate) fn has_breaking_stack_size(&self) -> bool {
        if !self.has_multiple_stacks() {
            return false;
        }
        let stored = self.curr_stack().stack_base - self.next_stack().stack_base;
        stored == self.nr_active
    }

    pub(crate) fn exceeds_depth(&self) -> bool {
        self.config
            .max_depth
            .is_some_and(|max| self.nr_active >= max)
    }

    pub(crate) fn mark_break(&mut self, cause: BreakCause) {
        if self.break_cause.is_none() {
            tracing::debug!(?cause, level = self.nr_active, "pass broken");
            self.break_cause = Some(cause);
        }
    }

    /// Structural invariants, for debug assertions only.
    pub(super) fn is_ok(&self) -> bool {
        let Some(first) = self.frames.first() else {
            return self.counters.is_empty() && self.nr_active == 0;
        };
        if first.stack_base != 0 {
            return false;
        }
        let ordered = self
            .frames
            .windows(2)
            .all(|w| w[0].stack_base <= w[1].stack_base);
        ordered && self.curr_stack().stack_base <= self.counters.len()
    }
}

/* ===================== Diagnostics ===================== */

/// Serializable view of the slot array split per frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StacksSnapshot {
    pub frames: Vec<FrameSnapshot>,
    pub nr_active: usize,
    pub break_cause: Option<BreakCause>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub stack_base: usize,
    pub slots: Vec<usize>,
}
