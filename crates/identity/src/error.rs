use thiserror::Error;

/// Errors from identity-service lookups.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The identity service could not be reached or failed.
    #[error("identity service unavailable: {0}")]
    Unavailable(String),

    /// The token was rejected or lacks access to the project.
    #[error("identity service denied access: {0}")]
    Denied(String),

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// The response could not be decoded.
    #[error("malformed identity response: {0}")]
    Malformed(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}
