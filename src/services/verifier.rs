use std::str::FromStr;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::models::IdentityClaims;
use crate::store::CredentialStore;

use super::AuthFailure;

pub const MIN_COMPANY_CODE: i64 = 1;
pub const MAX_COMPANY_CODE: i64 = 999_999;

/// How a presented password is compared against the stored secret.
///
/// Legacy installations keep plaintext secrets; newer ones store a sha256
/// hex digest. The strategy is process-wide configuration, never guessed
/// from the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretStrategy {
    Plain,
    Sha256,
}

impl FromStr for SecretStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" => Ok(SecretStrategy::Plain),
            "sha256" => Ok(SecretStrategy::Sha256),
            _ => Err(format!("Invalid secret strategy: {}", s)),
        }
    }
}

/// Decides whether presented credentials match an active user record.
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn CredentialStore>,
    strategy: SecretStrategy,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn CredentialStore>, strategy: SecretStrategy) -> Self {
        Self { store, strategy }
    }

    /// Verify a user code / password / company triple.
    ///
    /// Input checks run before any store call. Unknown user, inactive
    /// account and wrong password are indistinguishable in the result. On
    /// success the last-access timestamp is updated best-effort in the
    /// background.
    pub async fn verify(
        &self,
        user_code: &str,
        presented_secret: &str,
        company_code: i64,
    ) -> Result<IdentityClaims, AuthFailure> {
        let user_code = user_code.trim();
        let presented_secret = presented_secret.trim();

        if user_code.is_empty() || presented_secret.is_empty() {
            tracing::warn!("login attempt without credentials");
            return Err(AuthFailure::MissingCredentials);
        }

        if !(MIN_COMPANY_CODE..=MAX_COMPANY_CODE).contains(&company_code) {
            tracing::warn!(user_code, company_code, "login attempt with invalid company");
            return Err(AuthFailure::MissingCompany);
        }

        let record = self
            .store
            .find_by_code(user_code)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_code, "login rejected: unknown user");
                AuthFailure::InvalidCredentials
            })?;

        if !record.active {
            tracing::warn!(user_code, "login rejected: inactive user");
            return Err(AuthFailure::InvalidCredentials);
        }

        if !self.secret_matches(presented_secret, &record.secret) {
            tracing::warn!(user_code, "login rejected: wrong password");
            return Err(AuthFailure::InvalidCredentials);
        }

        let company_name = match self.store.company_name(company_code).await {
            Ok(Some(name)) => name,
            Ok(None) => format!("Company {}", company_code),
            Err(e) => {
                tracing::debug!(error = %e, company_code, "company name lookup skipped");
                format!("Company {}", company_code)
            }
        };

        let claims = IdentityClaims {
            user_code: record.user_code.to_uppercase(),
            display_name: record.display_name,
            company_code,
            company_name,
            role: record.role.unwrap_or_else(|| "user".to_string()),
            // stamped by the token issuer
            iat: 0,
            exp: 0,
        };

        let store = Arc::clone(&self.store);
        let code = claims.user_code.clone();
        tokio::spawn(async move {
            if let Err(e) = store.touch_last_access(&code).await {
                tracing::debug!(error = %e, user_code = %code, "last-access update skipped");
            }
        });

        tracing::info!(user_code = %claims.user_code, company_code, "user authenticated");
        Ok(claims)
    }

    fn secret_matches(&self, presented: &str, stored: &str) -> bool {
        match self.strategy {
            SecretStrategy::Plain => {
                presented.as_bytes().ct_eq(stored.trim().as_bytes()).into()
            }
            SecretStrategy::Sha256 => {
                let digest = hex::encode(Sha256::digest(presented.as_bytes()));
                digest
                    .as_bytes()
                    .ct_eq(stored.trim().to_lowercase().as_bytes())
                    .into()
            }
        }
    }
}
