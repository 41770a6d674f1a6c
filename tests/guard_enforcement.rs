use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

use fleet_authz::{
    AuthzMode, GrantedPermissions, Permission, PermissionEvaluator, Principal, RequirePermission,
    Role,
};

async fn cancel_booking(granted: GrantedPermissions) -> Json<Value> {
    Json(json!({
        "cancelled": true,
        "can_read_booking": granted.contains(Permission::ReadBooking),
        "granted_count": granted.0.len(),
    }))
}

async fn delete_user() -> Json<Value> {
    Json(json!({ "deleted": true }))
}

async fn reports() -> Json<Value> {
    Json(json!({ "report": "ok" }))
}

async fn ping() -> &'static str {
    "pong"
}

async fn unguarded(granted: GrantedPermissions) -> Json<Value> {
    Json(json!({ "granted_count": granted.0.len() }))
}

fn app(authz: Arc<PermissionEvaluator>) -> Router {
    let bookings = Router::new()
        .route("/bookings/:id/cancel", post(cancel_booking))
        .route_layer(RequirePermission::new(authz.clone(), Permission::CancelBooking));

    let users = Router::new()
        .route("/users/:id", delete(delete_user))
        .route_layer(RequirePermission::new(authz.clone(), Permission::DeleteUser));

    let reporting = Router::new()
        .route("/reports", get(reports))
        .route_layer(RequirePermission::any(
            authz.clone(),
            [Permission::ViewDashboard, Permission::ReadAuditLogs],
        ));

    let approvals = Router::new()
        .route("/bookings/:id/approve", post(cancel_booking))
        .route_layer(RequirePermission::all(
            authz.clone(),
            [Permission::ApproveBooking, Permission::UpdateBooking],
        ));

    Router::new()
        .merge(bookings)
        .merge(users)
        .merge(reporting)
        .merge(approvals)
        // Guard deliberately missing: exercises the misconfiguration path.
        .route("/unguarded", get(unguarded))
}

fn request(method: &str, uri: &str, principal: Option<Principal>) -> Result<Request<Body>> {
    let mut req = Request::builder().method(method).uri(uri).body(Body::empty())?;
    if let Some(principal) = principal {
        req.extensions_mut().insert(principal);
    }
    Ok(req)
}

async fn body_json(resp: Response) -> Result<Value> {
    let bytes = resp.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn guard_enforcement_paths() -> Result<()> {
    let authz = Arc::new(PermissionEvaluator::default());
    let app = app(authz);

    let customer = Principal::new(Uuid::new_v4(), Role::Customer);
    let agent = Principal::new(Uuid::new_v4(), Role::Agent);
    let admin = Principal::new(Uuid::new_v4(), Role::Admin);

    // 1. No principal at all: rejected before the handler, 401.
    let resp = app
        .clone()
        .oneshot(request("POST", "/bookings/11111111-1111-1111-1111-111111111111/cancel", None)?)
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await?;
    assert_eq!(body["error"], "unauthorized");

    // 2. Customer holds booking:cancel: request passes and the resolved
    //    permission set is attached for the handler.
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/bookings/11111111-1111-1111-1111-111111111111/cancel",
            Some(customer.clone()),
        )?)
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await?;
    assert_eq!(body["can_read_booking"], true);
    assert_eq!(body["granted_count"], 14);

    // 3. Agent lacks booking:cancel: 403 and the handler never ran.
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/bookings/11111111-1111-1111-1111-111111111111/cancel",
            Some(agent.clone()),
        )?)
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = body_json(resp).await?;
    assert_eq!(body["error"], "forbidden");

    // 4. user:delete is admin-only.
    let resp = app
        .clone()
        .oneshot(request(
            "DELETE",
            "/users/22222222-2222-2222-2222-222222222222",
            Some(customer.clone()),
        )?)
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .clone()
        .oneshot(request(
            "DELETE",
            "/users/22222222-2222-2222-2222-222222222222",
            Some(admin.clone()),
        )?)
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // 5. Any-of check: agent passes via system:view_dashboard, customer has
    //    neither dashboard nor audit access.
    let resp = app.clone().oneshot(request("GET", "/reports", Some(agent.clone()))?).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(request("GET", "/reports", Some(customer.clone()))?)
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // 6. All-of check: agent holds both booking:approve and booking:update.
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/bookings/33333333-3333-3333-3333-333333333333/approve",
            Some(agent.clone()),
        )?)
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/bookings/33333333-3333-3333-3333-333333333333/approve",
            Some(customer.clone()),
        )?)
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // 7. Handler asking for GrantedPermissions on a route nobody guarded is a
    //    wiring bug, surfaced as 500 rather than a silent allow.
    let resp = app
        .clone()
        .oneshot(request("GET", "/unguarded", Some(customer.clone()))?)
        .await?;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await?;
    assert_eq!(body["error"], "misconfiguration");

    Ok(())
}

#[tokio::test]
async fn advisory_mode_logs_but_allows() -> Result<()> {
    let authz = Arc::new(PermissionEvaluator::default());
    let app = Router::new()
        .route("/users/:id", delete(delete_user))
        .route_layer(
            RequirePermission::new(authz, Permission::DeleteUser).with_mode(AuthzMode::Advisory),
        );

    // Denied on role level, but advisory mode lets the request through.
    let customer = Principal::new(Uuid::new_v4(), Role::Customer);
    let resp = app
        .clone()
        .oneshot(request(
            "DELETE",
            "/users/22222222-2222-2222-2222-222222222222",
            Some(customer),
        )?)
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn off_mode_skips_evaluation() -> Result<()> {
    let authz = Arc::new(PermissionEvaluator::default());
    let app = Router::new()
        .route("/ping", get(ping))
        .route_layer(RequirePermission::new(authz, Permission::AccessAdminPanel).with_mode(AuthzMode::Off));

    // No principal, admin-only route: off mode waves it through.
    let resp = app.clone().oneshot(request("GET", "/ping", None)?).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn denial_is_side_effect_free() -> Result<()> {
    use std::sync::atomic::{AtomicUsize, Ordering};

    static HITS: AtomicUsize = AtomicUsize::new(0);

    async fn counted() -> &'static str {
        HITS.fetch_add(1, Ordering::SeqCst);
        "ok"
    }

    let authz = Arc::new(PermissionEvaluator::default());
    let app = Router::new()
        .route("/settings", post(counted))
        .route_layer(RequirePermission::new(authz, Permission::ManageSettings));

    let customer = Principal::new(Uuid::new_v4(), Role::Customer);
    for _ in 0..3 {
        let resp = app
            .clone()
            .oneshot(request("POST", "/settings", Some(customer.clone()))?)
            .await?;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
    assert_eq!(HITS.load(Ordering::SeqCst), 0, "handler ran despite denial");

    let admin = Principal::new(Uuid::new_v4(), Role::Admin);
    let resp = app.clone().oneshot(request("POST", "/settings", Some(admin))?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(HITS.load(Ordering::SeqCst), 1);

    Ok(())
}
