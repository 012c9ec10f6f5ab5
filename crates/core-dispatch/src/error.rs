//! Error types for the dispatch crate

use thiserror::Error;

/// Errors raised while constructing a worker pool
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A pool needs at least one worker
    #[error("Worker pool capacity must be at least 1")]
    ZeroCapacity,

    /// The underlying thread pool could not be built
    #[error("Failed to build worker pool: {0}")]
    PoolBuild(String),
}
