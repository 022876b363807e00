use thiserror::Error;

use canopy_core::{ProjectId, ValidationError};
use canopy_state::StateError;

/// Errors that can occur during quota-set operations.
#[derive(Debug, Error)]
pub enum QuotaError {
    /// The caller may not perform the operation. The message is for logs
    /// only and must not be shown to the caller.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The target is not an immediate child of its resolved parent.
    #[error("project {project_id} is not a child of {parent_id}")]
    InvalidParent {
        parent_id: ProjectId,
        project_id: ProjectId,
    },

    /// The request body or a proposed limit was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An error occurred in the quota store.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// The service was misconfigured (e.g. missing required components).
    #[error("configuration error: {0}")]
    Configuration(String),
}
