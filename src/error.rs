//! Error types
//!
//! Misuse of the counter protocol (closing out of order, advancing a counter
//! that is not current) is a programming error and is only caught by debug
//! assertions. The errors here cover the few conditions a caller can
//! legitimately run into and recover from.

use thiserror::Error;

/// Failure to open a top-level counter on a [`CounterStacks`](crate::CounterStacks).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("counter stacks hold no frame; call reset() before opening counters")]
    NoFrame,

    #[error("pass was broken; reset() or pop_back() is required before resuming")]
    PassBroken,

    #[error("{0} counter(s) still active; a counter was leaked instead of closed")]
    CountersStillActive(usize),
}

/// Rejected change to a counter's value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CounterError {
    #[error("counter values only move forward: {requested} < {current}")]
    Regression { current: usize, requested: usize },

    #[error("counter is exhausted at {value} (stop value {stop})")]
    Exhausted { value: usize, stop: usize },
}

/// Configuration loading or validation failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
