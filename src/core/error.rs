//! Error types for the worker pool

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur while managing pool workers.
///
/// Failures inside a user callable are not errors: they are captured panics,
/// surfaced through [`Worker::wait`](crate::pool::Worker::wait).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PoolError {
    /// Failed to spawn a worker thread
    #[error("failed to spawn worker thread #{worker}: {source}")]
    Spawn {
        /// ID of the worker that failed to spawn
        worker: usize,
        /// Source IO error from the OS
        #[source]
        source: std::io::Error,
    },

    /// Failed to join a worker thread
    #[error("failed to join worker thread #{worker}")]
    Join {
        /// ID of the worker that failed to join
        worker: usize,
    },
}

impl PoolError {
    /// Create a spawn error
    pub fn spawn(worker: usize, source: std::io::Error) -> Self {
        PoolError::Spawn { worker, source }
    }

    /// Create a join error
    pub fn join(worker: usize) -> Self {
        PoolError::Join { worker }
    }
}
