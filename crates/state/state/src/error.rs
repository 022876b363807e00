use thiserror::Error;

/// Errors from quota store operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// A create hit an existing row. Callers fall back to an update.
    #[error("quota already exists: {0}")]
    QuotaExists(String),

    #[error("quota not found: {0}")]
    NotFound(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}
