use crate::event_source::SourceError;
use crate::pool::PoolError;
use crate::position::PositionError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}

/// Top-level error returned by the engine's driving loop. Every component
/// error is reachable through here via `?` without manual wrapping.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("event source: {0}")]
    Source(#[from] SourceError),

    #[error("pool: {0}")]
    Pool(#[from] PoolError),

    #[error("position: {0}")]
    Position(#[from] PositionError),

    #[error("strategy callback failed: {0}")]
    Strategy(String),

    #[error("run was cancelled at step {step_index}")]
    Cancelled { step_index: u64 },
}
