//! Shared helpers for router-level integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use intranet_auth::{
    build_router,
    config::{AppConfig, DatabaseConfig, Environment, JwtConfig, SecurityConfig},
    models::{CredentialRecord, IdentityClaims},
    services::SecretStrategy,
    store::MemoryStore,
    AppState,
};
use std::sync::Arc;
use tower::util::ServiceExt;

pub const TEST_SECRET_KEY: &str = "test-signing-key";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: MemoryStore,
}

impl TestApp {
    /// Build the full application over an in-memory store seeded with a few
    /// representative users.
    pub fn spawn() -> Self {
        let store = MemoryStore::new();

        store.insert(user("F04821", "Fulano de Tal", "secret", None, 1, true));
        store.insert(user("ADM001", "Alice Admin", "admin-pass", Some("ADMIN"), 1, true));
        store.insert(user("USER03", "Carol User", "secret", Some("user"), 3, true));
        store.insert(user("INACT1", "Bob Inactive", "secret", None, 1, false));
        store.insert_company(1, "Hospital Central");

        let config = test_config();
        let state = AppState::new(config, Arc::new(store.clone()));
        let router = build_router(state.clone());

        Self {
            router,
            state,
            store,
        }
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.post_raw(uri, body.to_string()).await
    }

    /// POST a body as-is, bypassing JSON serialization.
    pub async fn post_raw(&self, uri: &str, body: impl Into<String>) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.into()))
            .unwrap();

        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        self.router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// Log in over the HTTP surface and return the issued token.
    pub async fn login_token(&self, user_code: &str, password: &str, company: i64) -> String {
        let response = self
            .post_json(
                "/auth/login",
                serde_json::json!({
                    "userCode": user_code,
                    "password": password,
                    "companyCode": company,
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        body["token"].as_str().unwrap().to_string()
    }

    /// Issue a token directly, bypassing the login flow.
    pub fn token_for(&self, user_code: &str, role: &str, company_code: i64) -> String {
        let claims = IdentityClaims {
            user_code: user_code.to_string(),
            display_name: format!("{} display", user_code),
            company_code,
            company_name: format!("Company {}", company_code),
            role: role.to_string(),
            iat: 0,
            exp: 0,
        };
        self.state.tokens.issue(&claims).unwrap()
    }
}

pub fn user(
    user_code: &str,
    display_name: &str,
    secret: &str,
    role: Option<&str>,
    company_code: i64,
    active: bool,
) -> CredentialRecord {
    CredentialRecord {
        user_code: user_code.to_string(),
        display_name: display_name.to_string(),
        role: role.map(str::to_string),
        company_code,
        active,
        secret: secret.to_string(),
        last_access: None,
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        environment: Environment::Dev,
        service_name: "intranet-auth".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        port: 0,
        jwt: JwtConfig {
            secret_key: TEST_SECRET_KEY.to_string(),
            expiration_hours: 1,
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            secret_strategy: SecretStrategy::Plain,
            company_allowlist: vec![1, 2],
        },
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
