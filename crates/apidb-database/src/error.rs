//! Error types for pool operations and the startup probe.

use thiserror::Error;

/// Errors from pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Driver error, including acquire timeouts and a closed pool.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Pool exhausted and `wait_for_connections` is off.
    #[error("no connections available")]
    NoConnectionAvailable,

    /// Too many acquires already waiting.
    #[error("queue limit of {limit} pending acquires reached")]
    QueueLimitReached {
        /// The configured `queue_limit`.
        limit: usize,
    },
}

/// Why the startup connectivity probe failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The config lacked required variables; no connection was attempted.
    #[error("required environment variables not set: {}", .0.join(", "))]
    MissingVariables(Vec<&'static str>),

    /// The server could not be reached or refused the login.
    #[error("failed to acquire a connection: {0}")]
    Connect(#[source] PoolError),

    /// The probe task was cancelled or panicked.
    #[error("probe task did not complete: {0}")]
    Aborted(String),
}
