//! Request guards.
//!
//! Guards compose as stacked middleware layers: `require_auth` (or
//! `optional_auth`) runs first and puts verified [`IdentityClaims`] into the
//! request extensions, then any number of role/company filters narrow access.
//! Each guard either continues with the enriched request or short-circuits
//! with an error response.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::models::IdentityClaims;
use crate::AppState;

pub(crate) enum BearerError {
    Missing,
    WrongScheme,
}

impl From<BearerError> for AppError {
    fn from(err: BearerError) -> Self {
        match err {
            BearerError::Missing => {
                AppError::unauthorized("MISSING_TOKEN", "Access token is required")
            }
            BearerError::WrongScheme => AppError::unauthorized(
                "INVALID_TOKEN_FORMAT",
                "Invalid token format. Use: Bearer <token>",
            ),
        }
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, BearerError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(BearerError::Missing)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(BearerError::WrongScheme)
}

/// Required-mode guard: a valid bearer token or the request is rejected.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())?;
    let claims = state.tokens.verify(token)?;

    tracing::debug!(
        user_code = %claims.user_code,
        company_code = claims.company_code,
        "request authenticated"
    );
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Optional-mode guard: never rejects, inserts claims only when a valid
/// bearer token is present.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Ok(token) = bearer_token(req.headers()) {
        if let Ok(claims) = state.tokens.verify(token) {
            req.extensions_mut().insert(claims);
        }
    }

    next.run(req).await
}

/// Allow-list of role tags, matched case-insensitively.
#[derive(Clone)]
pub struct RoleFilter {
    allowed: Arc<Vec<String>>,
}

impl RoleFilter {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Arc::new(
                roles
                    .into_iter()
                    .map(|r| r.into().to_lowercase())
                    .collect(),
            ),
        }
    }

    /// Shortcut for administrative routes; both role spellings exist in the
    /// user table.
    pub fn admin() -> Self {
        Self::new(["admin", "administrador"])
    }

    fn accepts(&self, role: &str) -> bool {
        let role = role.to_lowercase();
        self.allowed.iter().any(|allowed| *allowed == role)
    }
}

/// Role filter. Must run after `require_auth`; a request that reaches it
/// without an identity is rejected as unauthenticated, not as forbidden.
pub async fn require_role(
    State(filter): State<RoleFilter>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<IdentityClaims>()
        .ok_or_else(|| AppError::unauthorized("NOT_AUTHENTICATED", "User is not authenticated"))?;

    if !filter.accepts(&claims.role) {
        tracing::warn!(
            user_code = %claims.user_code,
            role = %claims.role,
            "access denied: insufficient role"
        );
        return Err(AppError::forbidden(
            "INSUFFICIENT_ROLE",
            format!("Access denied for role {}", claims.role),
        ));
    }

    Ok(next.run(req).await)
}

/// Allow-list of company codes.
#[derive(Clone)]
pub struct CompanyFilter {
    allowed: Arc<Vec<i64>>,
}

impl CompanyFilter {
    pub fn new<I>(companies: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        Self {
            allowed: Arc::new(companies.into_iter().collect()),
        }
    }
}

/// Company filter, same contract as [`require_role`].
pub async fn require_company(
    State(filter): State<CompanyFilter>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<IdentityClaims>()
        .ok_or_else(|| AppError::unauthorized("NOT_AUTHENTICATED", "User is not authenticated"))?;

    if !filter.allowed.contains(&claims.company_code) {
        tracing::warn!(
            user_code = %claims.user_code,
            company_code = claims.company_code,
            "access denied: company not allowed"
        );
        return Err(AppError::forbidden(
            "COMPANY_NOT_ALLOWED",
            format!("Access denied for company {}", claims.company_code),
        ));
    }

    Ok(next.run(req).await)
}

/// Extractor for handlers behind `require_auth`.
pub struct CurrentUser(pub IdentityClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<IdentityClaims>().ok_or_else(|| {
            AppError::unauthorized("NOT_AUTHENTICATED", "User is not authenticated")
        })?;

        Ok(CurrentUser(claims.clone()))
    }
}

/// Extractor for handlers behind `optional_auth`.
pub struct MaybeUser(pub Option<IdentityClaims>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<IdentityClaims>().cloned()))
    }
}
