//! # Resumable Nested-Loop Engine
//!
//! Makes deeply nested iteration interruptible without coroutines or threads.
//!
//! ## Core Principles
//!
//! 1. **Re-entry from the top**: a suspended traversal is simply called again.
//!    It re-executes from its entry point, and every loop skips forward because
//!    its counter starts at the value it had when the traversal stopped.
//! 2. **Implicit checkpoint**: the only saved state is the flat slot array in
//!    [`CounterStacks`] plus the frame payloads. Nothing is serialized.
//! 3. **Scoped counters**: a [`ResumableCounter`] claims its slot when opened
//!    and records its value when dropped. `close()` marks a level as finished.
//! 4. **Explicit checks**: execution only stops at `inc()` and the
//!    `must_break*` calls; between checks the caller bounds the work done.
//!
//! Resumption relies on the traversal being deterministic: given unchanged
//! input it must open the same counters in the same order. An oracle `Break`
//! is the way to report that the input changed.

mod counter;
mod frame;
mod regions;
mod stacks;

#[cfg(test)]
mod tests;

pub use counter::{ResumableCounter, SAMPLE_100, SAMPLE_1000, SAMPLE_10000};
pub use frame::CounterStack;
pub use regions::DrawRegion;
pub use stacks::{BreakCause, CounterId, CounterStacks, FrameSnapshot, StacksSnapshot};
