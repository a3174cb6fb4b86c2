pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod simulate;
pub mod trigger;

// Re-export main types
pub use config::{EngineConfig, TriggerConfig};
pub use engine::{BreakCause, CounterStacks, DrawRegion, ResumableCounter};
pub use error::{ConfigError, CounterError, EngineError};
pub use trigger::{NeverSuspend, Signal, SuspendOracle, SuspendTrigger};
