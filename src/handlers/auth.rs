//! Authentication endpoints: login, token verify/refresh, logout.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Json, State},
    http::{header, HeaderMap},
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::auth::bearer_token;
use crate::models::{AccessLogEntry, IdentityClaims};
use crate::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Login request; field names match the intranet frontend contract.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_code: Option<String>,
    pub password: Option<String>,
    pub company_code: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Identity view returned to the frontend; never includes secrets or raw
/// timestamps.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub user_code: String,
    pub display_name: String,
    pub company_code: i64,
    pub company_name: String,
    pub role: String,
}

impl From<&IdentityClaims> for UserView {
    fn from(claims: &IdentityClaims) -> Self {
        Self {
            user_code: claims.user_code.clone(),
            display_name: claims.display_name.clone(),
            company_code: claims.company_code,
            company_name: claims.company_name.clone(),
            role: claims.role.clone(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    // A body that fails to deserialize gets the normal error envelope, not
    // the extractor's plain-text answer.
    let Json(req) = payload.map_err(|e| {
        AppError::bad_request("VALIDATION_ERROR", format!("Invalid request body: {}", e))
    })?;

    let user_code = req.user_code.unwrap_or_default();
    let password = req.password.unwrap_or_default();
    let company_code = req.company_code.unwrap_or(0);

    validate_login_format(&user_code, &password)?;

    let ip = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    tracing::info!(
        user_code = %user_code.trim(),
        company_code,
        ip = %ip,
        "login attempt"
    );

    let claims = state
        .verifier
        .verify(&user_code, &password, company_code)
        .await?;
    let token = state.tokens.issue(&claims)?;

    // Access log is best-effort and never delays or fails the login.
    let entry = AccessLogEntry::new(claims.user_code.clone(), company_code, ip, user_agent);
    let store = Arc::clone(&state.store);
    tokio::spawn(async move {
        if let Err(e) = store.record_access(&entry).await {
            tracing::debug!(error = %e, "access log write skipped");
        }
    });

    Ok(Json(LoginResponse {
        success: true,
        token,
        user: UserView::from(&claims),
    }))
}

/// POST /auth/verify
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<VerifyResponse>, AppError> {
    let token = bearer_token(&headers)?;
    let claims = state.tokens.verify(token)?;

    Ok(Json(VerifyResponse {
        success: true,
        user: UserView::from(&claims),
    }))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, AppError> {
    let token = bearer_token(&headers)?;
    let refreshed = state.tokens.refresh(token)?;

    Ok(Json(RefreshResponse {
        success: true,
        token: refreshed,
    }))
}

/// POST /auth/logout
///
/// Tokens are stateless, so there is nothing to revoke server-side; the
/// endpoint logs the event when the token is still valid and always
/// succeeds. The frontend discards its copy of the token.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<MessageResponse> {
    if let Ok(token) = bearer_token(&headers) {
        if let Ok(claims) = state.tokens.verify(token) {
            tracing::info!(
                user_code = %claims.user_code,
                company_code = claims.company_code,
                "user logged out"
            );
        }
    }

    Json(MessageResponse {
        success: true,
        message: "Logout completed".to_string(),
    })
}

// ============================================================================
// Helpers
// ============================================================================

const MAX_USER_CODE_LEN: usize = 30;
const MAX_PASSWORD_LEN: usize = 100;

/// Format checks on the raw request fields. Emptiness and company range are
/// the verifier's call; this only rejects values that could never be a valid
/// user code or password.
fn validate_login_format(user_code: &str, password: &str) -> Result<(), AppError> {
    let user_code = user_code.trim();

    if user_code.len() > MAX_USER_CODE_LEN {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            format!("userCode must be at most {} characters", MAX_USER_CODE_LEN),
        ));
    }

    if !user_code.is_empty()
        && !user_code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            "userCode may only contain letters, digits and underscore",
        ));
    }

    if password.trim().len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            format!("password must be at most {} characters", MAX_PASSWORD_LEN),
        ));
    }

    Ok(())
}

fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
