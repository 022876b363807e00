#![allow(clippy::needless_for_each)]

use canopy_core::ResourceQuota;

use super::schemas::{
    ErrorResponse, HealthResponse, MetricsResponse, QuotaSetResponse, QuotaSetUpdateRequest,
};

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "Canopy Quota API",
        version = "0.1.0",
        description = "Hierarchical quota sets: show, update, and reset per-project and per-user limits inside a project tree.",
        license(name = "Apache-2.0")
    ),
    tags(
        (name = "Health", description = "Service health and metrics"),
        (name = "Quota Sets", description = "Per-project and per-user resource limits")
    ),
    paths(
        super::health::health,
        super::quota_sets::show,
        super::quota_sets::detail,
        super::quota_sets::defaults,
        super::quota_sets::update,
        super::quota_sets::delete,
    ),
    components(schemas(
        ErrorResponse,
        HealthResponse,
        MetricsResponse,
        QuotaSetResponse,
        QuotaSetUpdateRequest,
        ResourceQuota,
    ))
)]
pub struct ApiDoc;
