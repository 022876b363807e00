use thiserror::Error;

/// Errors raised while parsing or validating a quota update.
///
/// Every variant is user-visible and names the offending resource, value,
/// and bound where one applies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Quota limit {limit} for {resource} must be -1 or greater.")]
    InvalidLimit { resource: String, limit: i64 },

    #[error(
        "Quota limit {limit} for {resource} must be greater than or equal to already used and reserved {minimum}."
    )]
    LimitBelowUsage {
        resource: String,
        limit: i64,
        minimum: i64,
    },

    #[error("Quota limit {limit} for {resource} must be less than or equal to {maximum}.")]
    LimitExceedsParentBudget {
        resource: String,
        limit: i64,
        maximum: i64,
    },

    #[error("{resource} must be an integer, got {value}.")]
    InvalidInteger { resource: String, value: String },

    #[error("invalid force flag: {0} (expected true or false)")]
    InvalidForceFlag(String),

    #[error("unknown quota resource: {0}")]
    UnknownResource(String),

    #[error("malformed request body: {0}")]
    MalformedBody(String),
}
