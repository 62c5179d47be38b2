pub mod error;
pub mod token;
pub mod verifier;

pub use error::{AuthFailure, TokenFailure};
pub use token::TokenService;
pub use verifier::{CredentialVerifier, SecretStrategy, MAX_COMPANY_CODE, MIN_COMPANY_CODE};
