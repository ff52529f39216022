//! Error types for admission and coordination.

use thiserror::Error;

/// Errors produced by pools, gates, the class registry and the orchestrator.
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// Invalid capacity, unknown resource class, or malformed configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A blocking wait on a gate or pool was interrupted.
    #[error("wait cancelled")]
    Cancelled,
    /// A permit was released without a matching acquire.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// A requester thread could not be started.
    #[error("failed to spawn requester: {0}")]
    Spawn(#[from] std::io::Error),
    /// A requester thread or task terminated abnormally.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl CoordinationError {
    /// True for the only recoverable outcome, an interrupted wait.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
