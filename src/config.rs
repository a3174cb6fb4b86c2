//! Engine configuration
//!
//! Values are resolved in this order (later wins):
//! 1. Built-in defaults
//! 2. TOML config file (`--config`, or `RESUMABLE_CONFIG_PATH`)
//! 3. Environment variables prefixed with `RESUMABLE_` (nested keys use `__`,
//!    e.g. `RESUMABLE_TRIGGER__BUDGET_MS=20`)
//! 4. Explicit builder overrides
//!
//! A `.env` file in the working directory is loaded before the environment
//! is read.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const ENV_PREFIX: &str = "RESUMABLE";
const CONFIG_PATH_VAR: &str = "RESUMABLE_CONFIG_PATH";

/* ===================== Config Types ===================== */

/// Policy knobs for [`CounterStacks`](crate::CounterStacks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deepest nesting a pass may open before it is treated as runaway and
    /// broken. `None` means unlimited.
    pub max_depth: Option<usize>,

    /// Number of frames reserved up front.
    pub frame_capacity: usize,

    /// Frames retained by `invalidate()`; older frames are folded together
    /// beyond this. `None` means unlimited.
    pub max_frames: Option<usize>,

    /// Settings for the built-in [`SuspendTrigger`](crate::SuspendTrigger).
    pub trigger: TriggerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            frame_capacity: 8,
            max_frames: None,
            trigger: TriggerConfig::default(),
        }
    }
}

/// Settings for [`SuspendTrigger`](crate::SuspendTrigger).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Time budget per resumption, in milliseconds. `None` disables the
    /// deadline; suspension then only happens on request.
    pub budget_ms: Option<u64>,

    /// Refuse to suspend until progress has been marked since the last resume.
    pub require_progress: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            budget_ms: None,
            require_progress: true,
        }
    }
}

impl TriggerConfig {
    pub fn budget(&self) -> Option<Duration> {
        self.budget_ms.map(Duration::from_millis)
    }
}

/* ===================== Loading ===================== */

impl EngineConfig {
    /// Load configuration from the default sources
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Reject settings that would make every pass break immediately.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == Some(0) {
            return Err(ConfigError::Invalid(
                "max_depth must be at least 1 when set".to_string(),
            ));
        }
        if self.max_frames == Some(0) {
            return Err(ConfigError::Invalid(
                "max_frames must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`EngineConfig`] with explicit overrides.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config_path: Option<PathBuf>,
    skip_env: bool,
    max_depth: Option<usize>,
    max_frames: Option<usize>,
    budget_ms: Option<u64>,
}

impl EngineConfigBuilder {
    /// Config file to read (overrides `RESUMABLE_CONFIG_PATH`)
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Ignore `.env` and process environment variables.
    pub fn skip_env(mut self, skip: bool) -> Self {
        self.skip_env = skip;
        self
    }

    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn max_frames(mut self, frames: Option<usize>) -> Self {
        self.max_frames = frames;
        self
    }

    pub fn budget_ms(mut self, budget: Option<u64>) -> Self {
        self.budget_ms = budget;
        self
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        if !self.skip_env {
            // A missing .env file is the normal case
            let _ = dotenvy::dotenv();
        }

        let path = self.config_path.or_else(|| {
            if self.skip_env {
                None
            } else {
                std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from)
            }
        });

        let mut builder = config::Config::builder();
        if let Some(path) = &path {
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }
        if !self.skip_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let mut cfg: EngineConfig = builder.build()?.try_deserialize()?;

        if self.max_depth.is_some() {
            cfg.max_depth = self.max_depth;
        }
        if self.max_frames.is_some() {
            cfg.max_frames = self.max_frames;
        }
        if self.budget_ms.is_some() {
            cfg.trigger.budget_ms = self.budget_ms;
        }

        cfg.validate()?;
        tracing::debug!(?path, config = ?cfg, "engine configuration loaded");
        Ok(cfg)
    }
}
