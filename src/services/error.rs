use thiserror::Error;

use crate::error::AppError;
use crate::store::StoreError;

/// Outcome of a failed credential verification.
///
/// Unknown user, wrong secret and inactive account all collapse into
/// `InvalidCredentials` so the error code never leaks whether an account
/// exists.
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("User code and password are required")]
    MissingCredentials,

    #[error("Company code is required")]
    MissingCompany,

    #[error("Invalid credentials or inactive user")]
    InvalidCredentials,

    #[error("Authentication backend failure")]
    Server(#[source] anyhow::Error),
}

/// Outcome of a failed token verification.
#[derive(Debug, Error)]
pub enum TokenFailure {
    #[error("Token is invalid")]
    Malformed,

    #[error("Token has expired")]
    Expired,

    #[error("Token signing failure")]
    Server(#[source] anyhow::Error),
}

impl From<StoreError> for AuthFailure {
    fn from(err: StoreError) -> Self {
        AuthFailure::Server(anyhow::Error::new(err))
    }
}

impl From<AuthFailure> for AppError {
    fn from(err: AuthFailure) -> Self {
        match err {
            AuthFailure::MissingCredentials => {
                AppError::bad_request("MISSING_CREDENTIALS", err.to_string())
            }
            AuthFailure::MissingCompany => {
                AppError::bad_request("MISSING_COMPANY", err.to_string())
            }
            AuthFailure::InvalidCredentials => {
                AppError::unauthorized("INVALID_CREDENTIALS", err.to_string())
            }
            AuthFailure::Server(e) => AppError::Internal(e),
        }
    }
}

impl From<TokenFailure> for AppError {
    fn from(err: TokenFailure) -> Self {
        match err {
            TokenFailure::Malformed => AppError::unauthorized("TOKEN_MALFORMED", err.to_string()),
            TokenFailure::Expired => AppError::unauthorized("TOKEN_EXPIRED", err.to_string()),
            TokenFailure::Server(e) => AppError::Internal(e),
        }
    }
}
