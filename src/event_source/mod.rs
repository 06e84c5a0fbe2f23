pub mod file_source;
pub mod normalize;
#[cfg(feature = "tabular-store")]
pub mod tabular;
pub mod types;

pub use file_source::FileEventSource;
pub use types::SwapEvent;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("data directory not found: {0}")]
    MissingDirectory(String),
    #[error("failed to parse page file {path}: {reason}")]
    BadPageFile { path: String, reason: String },
    #[error("tabular store error: {0}")]
    Store(String),
}

/// Pull-based, lazy time-ordered sequence of normalized swap events for one
/// pool. Implementations own whatever I/O handle backs them and release it
/// once exhausted.
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Result<Option<SwapEvent>, SourceError>;
}
