//! Domain records shared between the store, the verifier and the token layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row from the user table, read-only to this service.
///
/// `secret` holds whatever the store keeps for the user: the plaintext
/// password on legacy installations, or a sha256 hex digest when the
/// `sha256` comparison strategy is configured.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub user_code: String,
    pub display_name: String,
    pub role: Option<String>,
    pub company_code: i64,
    pub active: bool,
    pub secret: String,
    pub last_access: Option<DateTime<Utc>>,
}

/// Identity facts embedded in a signed token.
///
/// Claim names on the wire keep the legacy field names the intranet
/// frontend already understands. Values are frozen at issuance and can
/// drift from the user table until the token expires; that staleness
/// window is bounded by the configured TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(rename = "cd_usuario")]
    pub user_code: String,
    #[serde(rename = "nome_usuario")]
    pub display_name: String,
    #[serde(rename = "cd_multi_empresa")]
    pub company_code: i64,
    #[serde(rename = "nome_empresa")]
    pub company_name: String,
    #[serde(rename = "perfil")]
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// One successful login, written best-effort to the access log.
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub user_code: String,
    pub company_code: i64,
    pub ip_address: String,
    pub user_agent: String,
    pub logged_at: DateTime<Utc>,
}

impl AccessLogEntry {
    pub fn new(
        user_code: impl Into<String>,
        company_code: i64,
        ip_address: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            user_code: user_code.into(),
            company_code,
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
            logged_at: Utc::now(),
        }
    }
}
