use axum::Json;
use axum::extract::State;

use super::AppState;
use super::schemas::HealthResponse;

/// `GET /health` -- liveness plus the quota-set operation counters.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    summary = "Liveness and counters",
    description = "Always `ok` while the process serves requests; `metrics` counts quota-set operations since start.",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        metrics: state.service.metrics().snapshot().into(),
    })
}
