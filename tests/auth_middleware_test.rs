//! Guard behavior: required/optional authentication plus role and company
//! filters, exercised over the real router.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use common::{body_json, TestApp};
use intranet_auth::middleware::{require_role, RoleFilter};
use serde_json::json;
use tower::util::ServiceExt;

#[tokio::test]
async fn protected_route_requires_a_bearer_token() {
    let app = TestApp::spawn();

    let response = app.request("GET", "/users/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["errorCode"], json!("MISSING_TOKEN"));

    // present but not the Bearer scheme
    let request = Request::builder()
        .method("GET")
        .uri("/users/me")
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["errorCode"],
        json!("INVALID_TOKEN_FORMAT")
    );
}

#[tokio::test]
async fn protected_route_accepts_a_valid_token() {
    let app = TestApp::spawn();
    let token = app.login_token("F04821", "secret", 1).await;

    let response = app.request("GET", "/users/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["user"]["userCode"], json!("F04821"));
}

#[tokio::test]
async fn role_filter_matches_case_insensitively() {
    let app = TestApp::spawn();

    // seeded role tag is the upper-cased "ADMIN"
    let admin = app.login_token("ADM001", "admin-pass", 1).await;
    let response = app.request("GET", "/users", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let users = body["users"].as_array().unwrap();
    assert_eq!(body["total"], json!(users.len()));
    assert!(users.iter().any(|u| u["userCode"] == json!("F04821")));
    // secrets never leave the store
    assert!(users.iter().all(|u| u.get("secret").is_none()));
}

#[tokio::test]
async fn role_filter_rejects_insufficient_roles() {
    let app = TestApp::spawn();
    let token = app.login_token("F04821", "secret", 1).await;

    let response = app.request("GET", "/users", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["errorCode"],
        json!("INSUFFICIENT_ROLE")
    );
}

#[tokio::test]
async fn role_filter_without_authentication_is_unauthenticated_not_forbidden() {
    let app = TestApp::spawn();

    // a router that misses the require_auth layer entirely
    let router = Router::new()
        .route("/role-only", get(|| async { "ok" }))
        .layer(from_fn_with_state(RoleFilter::new(["admin"]), require_role));

    let response = router
        .oneshot(
            Request::builder()
                .uri("/role-only")
                .header(
                    "Authorization",
                    format!("Bearer {}", app.token_for("ADM001", "admin", 1)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["errorCode"],
        json!("NOT_AUTHENTICATED")
    );
}

#[tokio::test]
async fn company_filter_enforces_the_allow_list() {
    let app = TestApp::spawn();

    // allow-list is [1, 2]
    let inside = app.login_token("F04821", "secret", 1).await;
    let response = app.request("GET", "/companies/current", Some(&inside)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let outside = app.login_token("USER03", "secret", 3).await;
    let response = app
        .request("GET", "/companies/current", Some(&outside))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["errorCode"],
        json!("COMPANY_NOT_ALLOWED")
    );
}

#[tokio::test]
async fn optional_auth_never_rejects() {
    let app = TestApp::spawn();

    let response = app.request("GET", "/info", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        json!("Hello, anonymous visitor")
    );

    // a garbage token is ignored rather than rejected
    let response = app.request("GET", "/info", Some("garbage")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let token = app.login_token("F04821", "secret", 1).await;
    let response = app.request("GET", "/info", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Fulano de Tal"));
}

#[tokio::test]
async fn expired_token_is_rejected_by_the_guard() {
    let app = TestApp::spawn();
    let token = app.login_token("F04821", "secret", 1).await;
    let claims = app.state.tokens.verify(&token).unwrap();
    let expired = app.state.tokens.issue_with_ttl(&claims, 0).unwrap();

    let response = app.request("GET", "/users/me", Some(&expired)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["errorCode"],
        json!("TOKEN_EXPIRED")
    );
}
