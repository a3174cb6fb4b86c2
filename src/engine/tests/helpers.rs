//! Test helpers for engine tests
//!
//! A scripted oracle and a generic nested traversal over a box of
//! dimensions, recording every leaf it visits.

use std::cell::Cell;

use crate::engine::{CounterStacks, ResumableCounter};
use crate::error::EngineError;
use crate::trigger::{Signal, SuspendOracle};

/// Oracle answering from a script keyed by poll number (1-based).
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    polls: Cell<u64>,
    progress: Cell<u64>,
    suspend_at: Cell<Option<u64>>,
    suspend_every: Cell<Option<u64>>,
    break_at: Cell<Option<u64>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend on the `n`th poll only.
    pub fn suspend_at(n: u64) -> Self {
        let oracle = Self::default();
        oracle.suspend_at.set(Some(n));
        oracle
    }

    /// Suspend on every `n`th poll.
    pub fn suspend_every(n: u64) -> Self {
        let oracle = Self::default();
        oracle.suspend_every.set(Some(n));
        oracle
    }

    /// Break on the `n`th poll.
    pub fn break_at(n: u64) -> Self {
        let oracle = Self::default();
        oracle.break_at.set(Some(n));
        oracle
    }

    pub fn polls(&self) -> u64 {
        self.polls.get()
    }

    pub fn progress(&self) -> u64 {
        self.progress.get()
    }
}

impl SuspendOracle for ScriptedOracle {
    fn poll(&self) -> Signal {
        let n = self.polls.get() + 1;
        self.polls.set(n);

        if self.break_at.get() == Some(n) {
            return Signal::Break;
        }
        if self.suspend_at.get() == Some(n) {
            return Signal::Suspend;
        }
        match self.suspend_every.get() {
            Some(every) if n % every == 0 => Signal::Suspend,
            _ => Signal::Proceed,
        }
    }

    fn mark_progress(&self) {
        self.progress.set(self.progress.get() + 1);
    }
}

/// Visit every point of the box `dims` in lexicographic order, one counter
/// per dimension. Returns `Ok(true)` when the traversal completed.
pub fn walk<P>(
    stacks: &mut CounterStacks<P>,
    dims: &[usize],
    out: &mut Vec<Vec<usize>>,
) -> Result<bool, EngineError> {
    let root = ResumableCounter::open(stacks, dims.len() == 1)?;
    Ok(walk_from(root, dims, out))
}

/// Same traversal starting from an already opened counter.
pub fn walk_from<P>(mut root: ResumableCounter<'_, P>, dims: &[usize], out: &mut Vec<Vec<usize>>) -> bool {
    let done = walk_level(&mut root, dims, &mut Vec::new(), out);
    if done {
        root.close();
    }
    done
}

fn walk_level<P>(
    counter: &mut ResumableCounter<'_, P>,
    dims: &[usize],
    path: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) -> bool {
    let leaf = dims.len() == 1;

    while counter.value() < dims[0] {
        if leaf {
            if counter.must_break() || counter.must_break_or_suspend() {
                return false;
            }
            path.push(counter.value());
            out.push(path.clone());
            path.pop();
            counter.increment();
        } else {
            path.push(counter.value());
            let mut child = counter.nest(dims.len() == 2);
            let done = walk_level(&mut child, &dims[1..], path, out);
            path.pop();
            if !done {
                return false;
            }
            child.close();
            if !counter.inc() {
                return false;
            }
        }
    }
    true
}

/// Every point of the box `dims` in lexicographic order.
pub fn all_points(dims: &[usize]) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    walk_from(ResumableCounter::<()>::detached(), dims, &mut out);
    out
}

/// Open a single counter, advance it `n` times and suspend it.
pub fn advance<P>(stacks: &mut CounterStacks<P>, n: usize) {
    let mut counter = ResumableCounter::open(stacks, false).unwrap();
    for _ in 0..n {
        counter.increment();
    }
}
