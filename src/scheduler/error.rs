//! Scheduler error types.

use thiserror::Error;

/// Errors that can occur in the scheduling engine.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Task not found in the registry.
    #[error("task not found: {0}")]
    NotFound(String),

    /// Task id already present in the registry.
    #[error("task already exists: {0}")]
    AlreadyExists(String),

    /// I/O failure reading or writing the registry document.
    #[error("storage error: {0}")]
    Storage(String),

    /// The persisted registry document is malformed. Never silently
    /// replaced with an empty registry; callers should refuse to start.
    #[error("corrupt registry: {0}")]
    CorruptRegistry(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
