use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use canopy_engine::QuotaError;

/// Errors that can occur when running the Canopy server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A quota-set operation failed.
    #[error(transparent)]
    Quota(#[from] QuotaError),

    /// The request carries no usable caller context.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl ServerError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Quota(QuotaError::Forbidden(_)) => (
                StatusCode::FORBIDDEN,
                "Policy doesn't allow this operation to be performed.".to_owned(),
            ),
            Self::Quota(e @ (QuotaError::InvalidParent { .. } | QuotaError::Validation(_))) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            Self::Quota(e @ (QuotaError::State(_) | QuotaError::Configuration(_))) => {
                error!(error = %e, "quota operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            Self::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}
