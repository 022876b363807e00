use std::sync::Arc;

use axum::body::Body;
use axum::http::{self, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use canopy_core::{ProjectId, QuotaResource};
use canopy_engine::QuotaSetService;
use canopy_identity::{ProjectRecord, StaticIdentityService};
use canopy_server::api::AppState;
use canopy_server::config::CanopyConfig;
use canopy_server::state_factory::create_service;
use canopy_state::QuotaStore;
use canopy_state_memory::MemoryQuotaStore;

// -- Helpers --------------------------------------------------------------

/// root -> {a -> a1, b}
fn hierarchy() -> StaticIdentityService {
    StaticIdentityService::new([
        ProjectRecord::root("root"),
        ProjectRecord::child("a", "root"),
        ProjectRecord::child("a1", "a"),
        ProjectRecord::child("b", "root"),
    ])
}

fn build_app_with_store(store: Arc<MemoryQuotaStore>) -> axum::Router {
    let service = QuotaSetService::builder()
        .store(store)
        .identity(Arc::new(hierarchy()))
        .build()
        .expect("service should build");
    canopy_server::api::router(AppState::new(service))
}

fn build_app() -> axum::Router {
    build_app_with_store(Arc::new(MemoryQuotaStore::new()))
}

/// Caller headers: `(project, roles)` with a token so hierarchy is consulted.
struct As<'a> {
    project: &'a str,
    roles: &'a str,
    token: bool,
}

const ROOT_ADMIN: As<'static> = As {
    project: "root",
    roles: "admin",
    token: true,
};

fn member_of(project: &str) -> As<'_> {
    As {
        project,
        roles: "member",
        token: true,
    }
}

fn request(method: http::Method, uri: &str, caller: &As<'_>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Project-Id", caller.project)
        .header("X-User-Id", "tester")
        .header("X-Roles", caller.roles);
    if caller.token {
        builder = builder.header("X-Auth-Token", "secret-token");
    }
    match body {
        Some(json) => builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn put(app: &axum::Router, uri: &str, caller: &As<'_>, quota_set: Value) -> (StatusCode, Value) {
    send(
        app,
        request(
            http::Method::PUT,
            uri,
            caller,
            Some(json!({ "quota_set": quota_set })),
        ),
    )
    .await
}

async fn get(app: &axum::Router, uri: &str, caller: &As<'_>) -> (StatusCode, Value) {
    send(app, request(http::Method::GET, uri, caller, None)).await
}

// -- Health & docs --------------------------------------------------------

#[tokio::test]
async fn health_returns_metrics() {
    let app = build_app();
    get(&app, "/v3/os-quota-sets/a", &member_of("a")).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["metrics"]["shows"], 1);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = build_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-doc/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["paths"]["/v3/os-quota-sets/{id}"].is_object());
}

// -- Show / defaults / detail ---------------------------------------------

#[tokio::test]
async fn member_sees_own_project_defaults() {
    let app = build_app();
    for version in ["v2", "v3"] {
        let (status, json) = get(&app, &format!("/{version}/os-quota-sets/a"), &member_of("a")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["quota_set"]["id"], "a");
        assert_eq!(json["quota_set"]["cores"], 20);
        assert_eq!(json["quota_set"]["server_groups"], 10);
    }
}

#[tokio::test]
async fn member_of_sibling_is_forbidden() {
    let app = build_app();
    let (status, json) = get(&app, "/v3/os-quota-sets/a", &member_of("b")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        json["error"],
        "Policy doesn't allow this operation to be performed."
    );
}

#[tokio::test]
async fn parent_member_sees_child() {
    let app = build_app();
    let (status, _) = get(&app, "/v3/os-quota-sets/a1", &member_of("a")).await;
    assert_eq!(status, StatusCode::OK);
}

fn without_project(roles: &str) -> Request<Body> {
    Request::builder()
        .uri("/v3/os-quota-sets/a")
        .header("X-Roles", roles)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn caller_without_project_runs_flat() {
    let app = build_app();

    let (status, json) = send(&app, without_project("admin")).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["quota_set"]["id"], "a");

    let (status, json) = send(&app, without_project("member")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        json["error"],
        "Policy doesn't allow this operation to be performed."
    );
}

#[tokio::test]
async fn defaults_are_labelled_with_requested_id() {
    let app = build_app();
    let (status, json) = get(&app, "/v2/os-quota-sets/anything/defaults", &member_of("b")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quota_set"]["id"], "anything");
    assert_eq!(json["quota_set"]["instances"], 10);
    assert_eq!(json["quota_set"]["fixed_ips"], -1);
}

#[tokio::test]
async fn detail_is_v3_only() {
    let app = build_app();
    let (status, _) = get(&app, "/v2/os-quota-sets/root/detail", &ROOT_ADMIN).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = get(&app, "/v3/os-quota-sets/root/detail", &ROOT_ADMIN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["quota_set"]["cores"],
        json!({"limit": 20, "in_use": 0, "reserved": 0, "allocated": 0})
    );
}

// -- Update ---------------------------------------------------------------

#[tokio::test]
async fn parent_admin_updates_child_and_allocation_follows() {
    let app = build_app();
    let (status, json) = put(
        &app,
        "/v3/os-quota-sets/a",
        &ROOT_ADMIN,
        json!({"cores": 10, "instances": "4"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["quota_set"]["cores"], 10);
    assert_eq!(json["quota_set"]["instances"], 4);

    let (_, detail) = get(&app, "/v3/os-quota-sets/root/detail", &ROOT_ADMIN).await;
    assert_eq!(detail["quota_set"]["cores"]["allocated"], 10);
    assert_eq!(detail["quota_set"]["instances"]["allocated"], 4);
}

#[tokio::test]
async fn child_limit_cannot_exceed_parent_budget() {
    let app = build_app();
    let (status, _) = put(&app, "/v3/os-quota-sets/b", &ROOT_ADMIN, json!({"cores": 15})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = put(&app, "/v3/os-quota-sets/a", &ROOT_ADMIN, json!({"cores": 6})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("cores"), "{message}");
    assert!(message.contains('5'), "{message}");
}

#[tokio::test]
async fn force_skips_budget_check() {
    let app = build_app();
    let (status, json) = put(
        &app,
        "/v2/os-quota-sets/a",
        &ROOT_ADMIN,
        json!({"cores": 50, "force": "True"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quota_set"]["cores"], 50);
}

#[tokio::test]
async fn invalid_force_flag_is_rejected() {
    let app = build_app();
    let (status, _) = put(
        &app,
        "/v3/os-quota-sets/a",
        &ROOT_ADMIN,
        json!({"cores": 5, "force": "maybe"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn member_cannot_update_own_project() {
    let app = build_app();
    let (status, _) = put(&app, "/v3/os-quota-sets/a", &member_of("a"), json!({"cores": 5})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_role_updates_root_from_any_project() {
    let app = build_app();
    let caller = As {
        project: "a",
        roles: "admin",
        token: true,
    };
    // The admin role passes the project-context check everywhere.
    let (status, _) = put(&app, "/v3/os-quota-sets/root", &caller, json!({"cores": 5})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = put(
        &app,
        "/v3/os-quota-sets/root",
        &member_of("root"),
        json!({"cores": 5}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn flat_mode_uses_root_permission() {
    let app = build_app();
    let caller = As {
        project: "root",
        roles: "admin",
        token: false,
    };
    // Without a token the hierarchy is not consulted, so no parent budget applies.
    let (status, json) = put(&app, "/v3/os-quota-sets/a", &caller, json!({"cores": 99})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quota_set"]["cores"], 99);
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let app = build_app();

    let req = Request::builder()
        .method(http::Method::PUT)
        .uri("/v3/os-quota-sets/a")
        .header("X-Project-Id", "root")
        .header("X-Roles", "admin")
        .header("X-Auth-Token", "t")
        .body(Body::from("not json"))
        .unwrap();
    let (status, json) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("malformed"));

    let (status, _) = send(
        &app,
        request(
            http::Method::PUT,
            "/v3/os-quota-sets/a",
            &ROOT_ADMIN,
            Some(json!({"cores": 5})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bad_values_are_rejected() {
    let app = build_app();
    for body in [
        json!({"cores": -2}),
        json!({"cores": "ten"}),
        json!({"cores": 1.5}),
        json!({"unicorns": 1}),
    ] {
        let (status, json) = put(&app, "/v3/os-quota-sets/root", &ROOT_ADMIN, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body} -> {json}");
    }
}

#[tokio::test]
async fn null_and_empty_values_leave_limits_unchanged() {
    let app = build_app();
    let (status, json) = put(
        &app,
        "/v3/os-quota-sets/root",
        &ROOT_ADMIN,
        json!({"cores": null, "ram": "", "id": "root", "tenant_id": "root", "instances": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quota_set"]["cores"], 20);
    assert_eq!(json["quota_set"]["ram"], 51200);
    assert_eq!(json["quota_set"]["instances"], 0);
}

#[tokio::test]
async fn partial_failure_keeps_earlier_keys() {
    let app = build_app();
    // Keys apply in name order: cores (valid) is written before ram (invalid).
    let (status, _) = put(
        &app,
        "/v3/os-quota-sets/root",
        &ROOT_ADMIN,
        json!({"ram": -5, "cores": 7}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, json) = get(&app, "/v3/os-quota-sets/root", &ROOT_ADMIN).await;
    assert_eq!(json["quota_set"]["cores"], 7);
    assert_eq!(json["quota_set"]["ram"], 51200);
}

#[tokio::test]
async fn limit_below_usage_is_rejected() {
    let store = Arc::new(MemoryQuotaStore::new());
    store
        .record_usage(&ProjectId::new("a"), None, QuotaResource::Cores, 3, 1)
        .await
        .unwrap();
    let app = build_app_with_store(Arc::clone(&store));

    let (status, json) = put(&app, "/v3/os-quota-sets/a", &ROOT_ADMIN, json!({"cores": 2})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains('4'));

    // Delete zeroes through the validated path, so it fails too.
    let (status, _) = send(
        &app,
        request(http::Method::DELETE, "/v3/os-quota-sets/a", &ROOT_ADMIN, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn parent_cannot_shrink_below_children_allocation_unless_forced() {
    let app = build_app();
    let (status, _) = put(&app, "/v3/os-quota-sets/root", &ROOT_ADMIN, json!({"cores": 100})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = put(&app, "/v3/os-quota-sets/a", &ROOT_ADMIN, json!({"cores": 60})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = put(&app, "/v3/os-quota-sets/root", &ROOT_ADMIN, json!({"cores": 10})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("60"), "{json}");

    let (_, detail) = get(&app, "/v3/os-quota-sets/root/detail", &ROOT_ADMIN).await;
    assert_eq!(
        detail["quota_set"]["cores"],
        json!({"limit": 100, "in_use": 0, "reserved": 0, "allocated": 60})
    );

    let (status, json) = put(
        &app,
        "/v3/os-quota-sets/root",
        &ROOT_ADMIN,
        json!({"cores": 10, "force": true}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["quota_set"]["cores"], 10);
}

#[tokio::test]
async fn updated_value_reads_back_on_every_show() {
    let app = build_app();
    let (status, json) = put(&app, "/v3/os-quota-sets/root", &ROOT_ADMIN, json!({"ram": "512"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quota_set"]["ram"], 512);

    for _ in 0..2 {
        let (status, json) = get(&app, "/v3/os-quota-sets/root", &ROOT_ADMIN).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["quota_set"]["ram"], 512);
    }
}

#[tokio::test]
async fn repeated_update_leaves_identical_state() {
    let store = Arc::new(MemoryQuotaStore::new());
    let app = build_app_with_store(Arc::clone(&store));
    let root = ProjectId::new("root");
    let body = json!({"cores": 12, "ram": "512"});

    let (status, first) = put(&app, "/v3/os-quota-sets/root", &ROOT_ADMIN, body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let created = store.list_limits(&root).await.unwrap();

    // The second write finds the rows already there and updates them in place.
    let (status, second) = put(&app, "/v3/os-quota-sets/root", &ROOT_ADMIN, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);

    let updated = store.list_limits(&root).await.unwrap();
    assert_eq!(updated.len(), 2);
    for (before, after) in created.iter().zip(&updated) {
        assert_eq!(before.resource, after.resource);
        assert_eq!(before.limit, after.limit);
        assert_eq!(before.created_at, after.created_at);
        assert!(after.updated_at >= after.created_at);
    }
}

// -- User scope -----------------------------------------------------------

#[tokio::test]
async fn user_limits_are_bounded_by_project() {
    let app = build_app();
    let (status, json) = put(
        &app,
        "/v3/os-quota-sets/root?user_id=alice",
        &ROOT_ADMIN,
        json!({"cores": 8}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["quota_set"]["cores"], 8);

    let (status, _) = put(
        &app,
        "/v3/os-quota-sets/root?user_id=alice",
        &ROOT_ADMIN,
        json!({"cores": 21}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, project) = get(&app, "/v3/os-quota-sets/root", &ROOT_ADMIN).await;
    assert_eq!(project["quota_set"]["cores"], 20);
}

#[tokio::test]
async fn deleting_user_limits_restores_project_fallback() {
    let app = build_app();
    put(
        &app,
        "/v3/os-quota-sets/root?user_id=alice",
        &ROOT_ADMIN,
        json!({"cores": 8}),
    )
    .await;

    let (status, body) = send(
        &app,
        request(
            http::Method::DELETE,
            "/v2/os-quota-sets/root?user_id=alice",
            &ROOT_ADMIN,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, Value::Null);

    let (_, json) = get(&app, "/v3/os-quota-sets/root?user_id=alice", &ROOT_ADMIN).await;
    assert_eq!(json["quota_set"]["cores"], 20);
}

#[tokio::test]
async fn empty_user_id_means_project_scope() {
    let app = build_app();
    let (status, _) = put(
        &app,
        "/v3/os-quota-sets/root?user_id=",
        &ROOT_ADMIN,
        json!({"cores": 9}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = get(&app, "/v3/os-quota-sets/root", &ROOT_ADMIN).await;
    assert_eq!(json["quota_set"]["cores"], 9);
}

// -- Delete ---------------------------------------------------------------

#[tokio::test]
async fn delete_zeroes_child_and_releases_allocation() {
    let app = build_app();
    put(&app, "/v3/os-quota-sets/a", &ROOT_ADMIN, json!({"cores": 10})).await;

    let (status, _) = send(
        &app,
        request(http::Method::DELETE, "/v3/os-quota-sets/a", &ROOT_ADMIN, None),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, json) = get(&app, "/v3/os-quota-sets/a", &ROOT_ADMIN).await;
    assert_eq!(json["quota_set"]["cores"], 0);
    assert_eq!(json["quota_set"]["key_pairs"], 0);

    let (_, detail) = get(&app, "/v3/os-quota-sets/root/detail", &ROOT_ADMIN).await;
    assert_eq!(detail["quota_set"]["cores"]["allocated"], 0);
}

#[tokio::test]
async fn member_cannot_delete() {
    let app = build_app();
    let (status, _) = send(
        &app,
        request(http::Method::DELETE, "/v3/os-quota-sets/a", &member_of("a"), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// -- Configuration --------------------------------------------------------

fn app_from_toml(toml_str: &str) -> axum::Router {
    let config: CanopyConfig = toml::from_str(toml_str).unwrap();
    let service = create_service(&config).unwrap();
    canopy_server::api::router(AppState::new(service))
}

#[tokio::test]
async fn configured_app_applies_defaults_extensions_and_policy() {
    let app = app_from_toml(
        r#"
        [state.defaults]
        cores = 64

        [[identity.projects]]
        id = "root"

        [[identity.projects]]
        id = "a"
        parent_id = "root"

        [policy.rules]
        "quotas:update" = "role:admin or role:quota_manager"

        [extensions]
        enabled = []
        "#,
    );

    let (status, json) = get(&app, "/v3/os-quota-sets/a", &member_of("a")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quota_set"]["cores"], 64);
    assert!(json["quota_set"].get("server_groups").is_none());

    let manager = As {
        project: "root",
        roles: "quota_manager",
        token: true,
    };
    let (status, json) = put(&app, "/v3/os-quota-sets/a", &manager, json!({"cores": 32})).await;
    assert_eq!(status, StatusCode::OK, "{json}");

    // server_groups is hidden, so it is not a settable resource either.
    let (status, _) = put(
        &app,
        "/v3/os-quota-sets/a",
        &manager,
        json!({"server_groups": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // An empty value asks for no change, so the hidden key is skipped.
    let (status, json) = put(
        &app,
        "/v3/os-quota-sets/a",
        &manager,
        json!({"server_groups": "", "cores": 16}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["quota_set"]["cores"], 16);
}
