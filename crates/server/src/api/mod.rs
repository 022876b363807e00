pub mod context;
pub mod health;
pub mod openapi;
pub mod quota_sets;
pub mod schemas;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use canopy_engine::QuotaSetService;

use self::openapi::ApiDoc;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QuotaSetService>,
}

impl AppState {
    pub fn new(service: QuotaSetService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

fn quota_set_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/os-quota-sets/{id}",
            get(quota_sets::show)
                .put(quota_sets::update)
                .delete(quota_sets::delete),
        )
        .route("/os-quota-sets/{id}/defaults", get(quota_sets::defaults))
}

/// Build the Axum router with the quota-set routes, health, and Swagger UI.
pub fn router(state: AppState) -> Router {
    let v2 = quota_set_routes();
    let v3 = quota_set_routes().route("/os-quota-sets/{id}/detail", get(quota_sets::detail));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v2", v2)
        .nest("/v3", v3)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
