//! Checkpoint frame

/// One saved pass: the caller's description of the work still to be done and
/// the position in the shared slot array where this pass's nesting begins.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterStack<P> {
    pub payload: P,
    pub stack_base: usize,
}

impl<P> CounterStack<P> {
    pub fn new(payload: P, stack_base: usize) -> Self {
        Self {
            payload,
            stack_base,
        }
    }
}
