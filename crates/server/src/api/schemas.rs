use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use canopy_core::UserId;
use canopy_engine::MetricsSnapshot;

/// Error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Quota limit 80 for cores must be less than or equal to 70.")]
    pub error: String,
}

/// A project's quota set.
///
/// `quota_set` carries the project `id` plus one key per enabled resource.
/// Show and defaults return integer limits; detail returns
/// `{limit, in_use, reserved, allocated}` objects (see `ResourceQuota`).
#[derive(Debug, Serialize, ToSchema)]
pub struct QuotaSetResponse {
    #[schema(value_type = Object, example = json!({
        "id": "team-a",
        "cores": 20,
        "instances": 10,
        "ram": 51200
    }))]
    pub quota_set: Value,
}

/// Update request body.
///
/// Every key other than `force`, `id`, and `tenant_id` names a resource.
/// Values are integers or integer strings; `-1` means unlimited. `force`
/// skips usage and parent-budget checks.
#[derive(Debug, Deserialize, ToSchema)]
pub struct QuotaSetUpdateRequest {
    #[schema(value_type = Object, example = json!({
        "cores": 30,
        "instances": "15",
        "force": false
    }))]
    pub quota_set: Value,
}

/// Optional user scope of a quota-set request.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserScope {
    /// Act on this user's limits inside the project instead of the
    /// project's own.
    pub user_id: Option<String>,
}

impl UserScope {
    /// The requested user, treating an empty value as absent.
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(UserId::from)
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub metrics: MetricsResponse,
}

/// Quota-set operation counters.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MetricsResponse {
    /// Quota sets shown.
    #[schema(example = 42)]
    pub shows: u64,
    /// Detail views served.
    pub details: u64,
    /// Default sets served.
    pub defaults: u64,
    /// Updates completed.
    #[schema(example = 7)]
    pub updates: u64,
    /// Deletes completed.
    pub deletes: u64,
    /// Individual limit rows written.
    #[schema(example = 19)]
    pub limits_written: u64,
    /// Requests refused by policy or identity failures.
    pub forbidden: u64,
    /// Requests whose target was not a child of its parent.
    pub invalid_parent: u64,
    /// Requests rejected by parsing or limit validation.
    pub validation_failed: u64,
    /// Requests that failed in the quota store.
    pub store_errors: u64,
}

impl From<MetricsSnapshot> for MetricsResponse {
    fn from(snap: MetricsSnapshot) -> Self {
        Self {
            shows: snap.shows,
            details: snap.details,
            defaults: snap.defaults,
            updates: snap.updates,
            deletes: snap.deletes,
            limits_written: snap.limits_written,
            forbidden: snap.forbidden,
            invalid_parent: snap.invalid_parent,
            validation_failed: snap.validation_failed,
            store_errors: snap.store_errors,
        }
    }
}
