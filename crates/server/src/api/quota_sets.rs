//! `os-quota-sets` endpoints.
//!
//! The same handlers serve `/v2` and `/v3`; `detail` is only routed under
//! `/v3`.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde_json::Value;

use canopy_core::{ProjectId, QuotaSetEnvelope, QuotaSetUpdate, ValidationError};
use canopy_engine::QuotaError;

use super::AppState;
use super::context::Caller;
use super::schemas::{ErrorResponse, QuotaSetResponse, QuotaSetUpdateRequest, UserScope};
use crate::error::ServerError;

fn parse_update(body: &[u8]) -> Result<QuotaSetUpdate, ServerError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| QuotaError::Validation(ValidationError::MalformedBody(e.to_string())))?;
    Ok(QuotaSetUpdate::from_value(value).map_err(QuotaError::Validation)?)
}

/// `GET /v3/os-quota-sets/{id}` -- current limits of a project or user.
#[utoipa::path(
    get,
    path = "/v3/os-quota-sets/{id}",
    tag = "Quota Sets",
    summary = "Show quota set",
    description = "Returns the effective limits of the project, or of `user_id` inside it. Also served under `/v2`.",
    params(("id" = String, Path, description = "Target project id"), UserScope),
    responses(
        (status = 200, description = "Effective limits", body = QuotaSetResponse),
        (status = 401, description = "Unreadable caller headers", body = ErrorResponse),
        (status = 403, description = "Not permitted", body = ErrorResponse)
    )
)]
pub async fn show(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    Query(scope): Query<UserScope>,
) -> Result<Json<QuotaSetEnvelope>, ServerError> {
    let user_id = scope.user_id();
    let set = state
        .service
        .show(&ctx, &ProjectId::new(id), user_id.as_ref())
        .await?;
    Ok(Json(set.into_envelope()))
}

/// `GET /v3/os-quota-sets/{id}/detail` -- limits with usage figures.
#[utoipa::path(
    get,
    path = "/v3/os-quota-sets/{id}/detail",
    tag = "Quota Sets",
    summary = "Show quota set detail",
    description = "Returns `{limit, in_use, reserved, allocated}` per resource. Only available under `/v3`.",
    params(("id" = String, Path, description = "Target project id"), UserScope),
    responses(
        (status = 200, description = "Limits and usage", body = QuotaSetResponse),
        (status = 401, description = "Unreadable caller headers", body = ErrorResponse),
        (status = 403, description = "Not permitted", body = ErrorResponse)
    )
)]
pub async fn detail(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    Query(scope): Query<UserScope>,
) -> Result<Json<QuotaSetEnvelope>, ServerError> {
    let user_id = scope.user_id();
    let set = state
        .service
        .detail(&ctx, &ProjectId::new(id), user_id.as_ref())
        .await?;
    Ok(Json(set.into_envelope()))
}

/// `GET /v3/os-quota-sets/{id}/defaults` -- the default limits.
#[utoipa::path(
    get,
    path = "/v3/os-quota-sets/{id}/defaults",
    tag = "Quota Sets",
    summary = "Show default quotas",
    description = "Returns the default limits labelled with the requested id. Also served under `/v2`.",
    params(("id" = String, Path, description = "Project id used as label")),
    responses(
        (status = 200, description = "Default limits", body = QuotaSetResponse),
        (status = 401, description = "Unreadable caller headers", body = ErrorResponse),
        (status = 403, description = "Not permitted", body = ErrorResponse)
    )
)]
pub async fn defaults(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<Json<QuotaSetEnvelope>, ServerError> {
    let set = state.service.defaults(&ctx, &ProjectId::new(id)).await?;
    Ok(Json(set.into_envelope()))
}

/// `PUT /v3/os-quota-sets/{id}` -- set limits.
#[utoipa::path(
    put,
    path = "/v3/os-quota-sets/{id}",
    tag = "Quota Sets",
    summary = "Update quota set",
    description = "Validates and writes each resource in the body, then returns the resulting limits. \
        Keys are applied in name order; a failing key leaves earlier writes in place. Also served under `/v2`.",
    params(("id" = String, Path, description = "Target project id"), UserScope),
    request_body = QuotaSetUpdateRequest,
    responses(
        (status = 200, description = "Resulting limits", body = QuotaSetResponse),
        (status = 400, description = "Invalid body, limit, or parent", body = ErrorResponse),
        (status = 401, description = "Unreadable caller headers", body = ErrorResponse),
        (status = 403, description = "Not permitted", body = ErrorResponse)
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    Query(scope): Query<UserScope>,
    body: Bytes,
) -> Result<Json<QuotaSetEnvelope>, ServerError> {
    let update = parse_update(&body)?;
    let user_id = scope.user_id();
    let set = state
        .service
        .update(&ctx, &ProjectId::new(id), user_id.as_ref(), &update)
        .await?;
    Ok(Json(set.into_envelope()))
}

/// `DELETE /v3/os-quota-sets/{id}` -- reset limits.
#[utoipa::path(
    delete,
    path = "/v3/os-quota-sets/{id}",
    tag = "Quota Sets",
    summary = "Delete quota set",
    description = "With `user_id`, drops that user's limits. Otherwise sets every enabled resource \
        of the project to `0`, which fails while the project still consumes resources. Also served under `/v2`.",
    params(("id" = String, Path, description = "Target project id"), UserScope),
    responses(
        (status = 202, description = "Limits reset"),
        (status = 400, description = "Limit below usage or invalid parent", body = ErrorResponse),
        (status = 401, description = "Unreadable caller headers", body = ErrorResponse),
        (status = 403, description = "Not permitted", body = ErrorResponse)
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    Query(scope): Query<UserScope>,
) -> Result<StatusCode, ServerError> {
    let user_id = scope.user_id();
    state
        .service
        .delete(&ctx, &ProjectId::new(id), user_id.as_ref())
        .await?;
    Ok(StatusCode::ACCEPTED)
}
