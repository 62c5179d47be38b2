//! Routes gated by the access guards.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::{CurrentUser, MaybeUser};
use crate::AppState;

use super::auth::UserView;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_code: String,
    pub display_name: String,
    pub role: String,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<UserSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub success: bool,
    pub message: String,
}

/// GET /users/me. Requires authentication.
pub async fn get_me(CurrentUser(claims): CurrentUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        success: true,
        user: UserView::from(&claims),
    })
}

/// GET /users. Admin only; lists users of the caller's own company.
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Json<UserListResponse>, AppError> {
    let records = state
        .store
        .list_by_company(claims.company_code)
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;

    let users: Vec<UserSummary> = records
        .into_iter()
        .map(|r| UserSummary {
            user_code: r.user_code.to_uppercase(),
            display_name: r.display_name,
            role: r.role.unwrap_or_else(|| "user".to_string()),
            active: r.active,
        })
        .collect();

    let total = users.len();
    Ok(Json(UserListResponse {
        success: true,
        users,
        total,
    }))
}

/// GET /companies/current. Restricted to the configured company allow-list.
pub async fn company_data(CurrentUser(claims): CurrentUser) -> Json<InfoResponse> {
    Json(InfoResponse {
        success: true,
        message: format!(
            "Company data for {} ({})",
            claims.company_name, claims.company_code
        ),
    })
}

/// GET /info. Reachable with or without a token.
pub async fn public_info(MaybeUser(claims): MaybeUser) -> Json<InfoResponse> {
    let message = match claims {
        Some(claims) => format!("Hello {}, you are logged in", claims.display_name),
        None => "Hello, anonymous visitor".to_string(),
    };

    Json(InfoResponse {
        success: true,
        message,
    })
}
