//! Error kinds surfaced by the dispatcher and the lifecycle controller.

use thiserror::Error;

use crate::cancel::CancelReason;

/// Boxed error coming out of a task source.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("pool size must be at least 1")]
    InvalidPoolSize,
    #[error("chunk size must be at least 1")]
    InvalidChunkSize,
    #[error("source read failed: {0}")]
    SourceRead(#[source] SourceError),
    #[error("canceled: {0}")]
    Canceled(CancelReason),
    #[error("{count} worker(s) panicked")]
    WorkerPanicked { count: usize },
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("stop called on a handle that is already stopped")]
    AlreadyStopped,
    #[error("stop canceled before cleanup finished: {0}")]
    Canceled(CancelReason),
    #[error("tick interval must be greater than zero")]
    InvalidInterval,
    #[error("background operation panicked")]
    Panicked,
    #[error("failed to spawn background thread: {0}")]
    Spawn(#[from] std::io::Error),
}
