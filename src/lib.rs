pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::{CompanyFilter, RoleFilter};
use crate::services::{CredentialVerifier, TokenService};
use crate::store::CredentialStore;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn CredentialStore>,
    pub verifier: CredentialVerifier,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn CredentialStore>) -> Self {
        let verifier = CredentialVerifier::new(
            Arc::clone(&store),
            config.security.secret_strategy,
        );
        let tokens = TokenService::new(&config.jwt);

        Self {
            config,
            store,
            verifier,
            tokens,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Admin-only and company-gated routes sit behind their filters; the
    // filters themselves sit behind require_auth, so authentication always
    // runs first and the filters see a populated identity.
    let admin_routes = Router::new()
        .route("/users", get(handlers::user::list_users))
        .layer(from_fn_with_state(
            RoleFilter::admin(),
            middleware::require_role,
        ));

    let company_routes = Router::new()
        .route("/companies/current", get(handlers::user::company_data))
        .layer(from_fn_with_state(
            CompanyFilter::new(state.config.security.company_allowlist.clone()),
            middleware::require_company,
        ));

    let protected = Router::new()
        .route("/users/me", get(handlers::user::get_me))
        .merge(admin_routes)
        .merge(company_routes)
        .layer(from_fn_with_state(state.clone(), middleware::require_auth));

    let public = Router::new().route("/info", get(handlers::user::public_info)).layer(
        from_fn_with_state(state.clone(), middleware::optional_auth),
    );

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .security
                .allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::error!(origin = %origin, error = %e, "invalid CORS origin skipped");
                        None
                    }
                })
                .collect::<Vec<HeaderValue>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/verify", post(handlers::auth::verify))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .merge(protected)
        .merge(public)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(cors)
}

/// Service health check; reports the credential store as up or down.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "credential store health check failed");
        AppError::Unavailable("credential store unreachable".to_string())
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "checks": {
            "store": "up"
        }
    })))
}
