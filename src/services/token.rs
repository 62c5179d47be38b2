use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::config::JwtConfig;
use crate::models::IdentityClaims;

use super::TokenFailure;

/// Issues and verifies HS256-signed identity tokens.
///
/// Stateless by design: once issued, a token is trusted on its signature and
/// expiry alone, with no revocation list. A role change or deactivation in
/// the store only takes effect when the old token expires.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_hours: i64,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            ttl_hours: config.expiration_hours,
        }
    }

    /// Sign the claims with the configured TTL, stamping fresh `iat`/`exp`.
    pub fn issue(&self, claims: &IdentityClaims) -> Result<String, TokenFailure> {
        self.issue_with_ttl(claims, self.ttl_hours)
    }

    pub fn issue_with_ttl(
        &self,
        claims: &IdentityClaims,
        ttl_hours: i64,
    ) -> Result<String, TokenFailure> {
        let now = Utc::now();
        let stamped = IdentityClaims {
            iat: now.timestamp(),
            exp: (now + Duration::hours(ttl_hours)).timestamp(),
            ..claims.clone()
        };

        encode(&Header::new(Algorithm::HS256), &stamped, &self.encoding_key)
            .map_err(|e| TokenFailure::Server(anyhow::anyhow!("token encoding failed: {}", e)))
    }

    /// Validate signature and expiry, returning the embedded claims as-is.
    ///
    /// Expiry is checked explicitly so the boundary instant itself counts as
    /// expired (`now == exp` fails), with no clock leeway.
    pub fn verify(&self, token: &str) -> Result<IdentityClaims, TokenFailure> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let data = decode::<IdentityClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenFailure::Malformed)?;

        if Utc::now().timestamp() >= data.claims.exp {
            return Err(TokenFailure::Expired);
        }

        Ok(data.claims)
    }

    /// Re-issue a still-valid token with fresh `iat`/`exp` and identical
    /// other claims. Fails exactly as `verify` does on bad input.
    pub fn refresh(&self, token: &str) -> Result<String, TokenFailure> {
        let claims = self.verify(token)?;
        self.issue(&claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service(ttl_hours: i64) -> TokenService {
        TokenService::new(&JwtConfig {
            secret_key: "test-signing-key".to_string(),
            expiration_hours: ttl_hours,
        })
    }

    fn sample_claims() -> IdentityClaims {
        IdentityClaims {
            user_code: "F04821".to_string(),
            display_name: "Fulano de Tal".to_string(),
            company_code: 1,
            company_name: "Company 1".to_string(),
            role: "user".to_string(),
            iat: 0,
            exp: 0,
        }
    }

    #[test]
    fn issue_then_verify_round_trips_claims() {
        let service = test_service(24);
        let token = service.issue(&sample_claims()).unwrap();
        assert!(!token.is_empty());

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.user_code, "F04821");
        assert_eq!(claims.display_name, "Fulano de Tal");
        assert_eq!(claims.company_code, 1);
        assert_eq!(claims.company_name, "Company 1");
        assert_eq!(claims.role, "user");
        assert!(claims.iat > 0);
        assert_eq!(claims.exp, claims.iat + 24 * 3600);
    }

    #[test]
    fn expiry_boundary_is_expired() {
        let service = test_service(24);
        // ttl of zero stamps exp == now, which must already count as expired
        let token = service.issue_with_ttl(&sample_claims(), 0).unwrap();

        match service.verify(&token) {
            Err(TokenFailure::Expired) => {}
            other => panic!("expected Expired, got {:?}", other.map(|c| c.user_code)),
        }
    }

    #[test]
    fn garbage_and_wrong_key_are_malformed() {
        let service = test_service(24);
        assert!(matches!(
            service.verify("not-a-token"),
            Err(TokenFailure::Malformed)
        ));

        let other = TokenService::new(&JwtConfig {
            secret_key: "another-key".to_string(),
            expiration_hours: 24,
        });
        let token = other.issue(&sample_claims()).unwrap();
        assert!(matches!(
            service.verify(&token),
            Err(TokenFailure::Malformed)
        ));
    }

    #[tokio::test]
    async fn refresh_advances_timestamps_and_keeps_identity() {
        let service = test_service(24);
        let token = service.issue(&sample_claims()).unwrap();
        let original = service.verify(&token).unwrap();

        // timestamps have second resolution
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        let refreshed = service.refresh(&token).unwrap();
        let claims = service.verify(&refreshed).unwrap();

        assert!(claims.iat > original.iat);
        assert!(claims.exp > original.exp);
        assert_eq!(claims.user_code, original.user_code);
        assert_eq!(claims.display_name, original.display_name);
        assert_eq!(claims.company_code, original.company_code);
        assert_eq!(claims.company_name, original.company_name);
        assert_eq!(claims.role, original.role);
    }

    #[test]
    fn refresh_rejects_expired_and_malformed_tokens() {
        let service = test_service(24);

        let expired = service.issue_with_ttl(&sample_claims(), 0).unwrap();
        assert!(matches!(
            service.refresh(&expired),
            Err(TokenFailure::Expired)
        ));
        assert!(matches!(
            service.refresh("garbage"),
            Err(TokenFailure::Malformed)
        ));
    }
}
