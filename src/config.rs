use ethnum::U256;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_step_ms() -> u64 {
    1000
}

fn default_metrics_interval_ms() -> u64 {
    60_000
}

/// Everything the Engine needs to construct a Pool, a PositionManager, and
/// (indirectly, via `data_dir`) an EventSource. Loading this from a file or
/// environment is outside the engine's responsibility; callers build it and
/// hand it to `Engine::new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub pool_id: String,
    pub start_time: u64,
    pub end_time: u64,

    pub decimals0: u8,
    pub decimals1: u8,
    pub token0_name: String,
    pub token1_name: String,

    pub fee_rate_ppm: u32,
    pub tick_spacing: i32,

    #[serde(default = "default_step_ms")]
    pub step_ms: u64,

    /// When set, swap events are read from a directory of JSON page files
    /// instead of the tabular store.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Horizon used when priming the Pool ahead of `start_time`; defaults to
    /// `start_time` (no separate seed window).
    #[serde(default)]
    pub pool_seed_end_time: Option<u64>,

    #[serde(default = "default_metrics_interval_ms")]
    pub metrics_interval_ms: u64,

    #[serde(default)]
    pub pool_seed_event_count: u32,

    pub invest0: U256,
    pub invest1: U256,

    #[serde(default)]
    pub simulate_errors: u32,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.end_time <= self.start_time {
            return Err(ConfigError::Invalid {
                field: "end_time",
                reason: "must be greater than start_time",
            });
        }
        if self.token0_name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "token0_name",
                reason: "must not be empty",
            });
        }
        if self.token1_name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "token1_name",
                reason: "must not be empty",
            });
        }
        if self.tick_spacing <= 0 {
            return Err(ConfigError::Invalid {
                field: "tick_spacing",
                reason: "must be a positive integer",
            });
        }
        if self.step_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "step_ms",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    pub fn pool_seed_end_time(&self) -> u64 {
        self.pool_seed_end_time.unwrap_or(self.start_time)
    }
}
