pub mod config;
pub mod engine;
pub mod error;
pub mod event_source;
pub mod libraries;
pub mod pool;
pub mod position;
pub mod strategy;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use event_source::{EventSource, SwapEvent};
pub use pool::Pool;
pub use position::PositionManager;
pub use strategy::{Context, Strategy};
