//! Session token issuance and verification.
//!
//! Tokens are stateless HS256 JWTs carrying the user's email as subject and an
//! absolute expiry. There is no revocation list; a token stays valid until `exp`.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::{ServiceError, ServiceResult};

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the user's email
    pub sub: String,
    /// Token expiration timestamp
    pub exp: i64,
    /// Token issued at timestamp
    pub iat: i64,
}

/// Creates and validates signed session tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
}

impl TokenService {
    /// Builds the service from the startup configuration.
    pub fn new(config: &Config) -> Self {
        Self::with_secret(config.jwt_secret.as_bytes(), config.access_token_ttl())
    }

    pub fn with_secret(secret: &[u8], default_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        TokenService {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issues a token for `subject` that expires `ttl` from now.
    pub fn issue(&self, subject: &str, ttl: Duration) -> ServiceResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::internal_error(format!("Token generation failed: {e}")))
    }

    /// Issues a token with the configured default lifetime.
    pub fn issue_default(&self, subject: &str) -> ServiceResult<String> {
        self.issue(subject, self.default_ttl)
    }

    /// Verifies signature and expiry and returns the subject.
    ///
    /// Every failure is reported as the same `Unauthenticated` error.
    pub fn verify(&self, token: &str) -> ServiceResult<String> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|token_data| token_data.claims)
            .map_err(|e| {
                tracing::debug!("Session token rejected: {}", e);
                ServiceError::invalid_credential()
            })?;

        if claims.sub.is_empty() {
            return Err(ServiceError::invalid_credential());
        }

        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AuthFailure;

    fn service() -> TokenService {
        TokenService::with_secret(b"test-secret", Duration::minutes(30))
    }

    fn assert_invalid(result: ServiceResult<String>) {
        match result {
            Err(ServiceError::Unauthenticated(AuthFailure::InvalidCredential)) => {}
            other => panic!("expected invalid credential, got {other:?}"),
        }
    }

    #[test]
    fn issued_token_verifies_to_subject() {
        let tokens = service();
        let token = tokens.issue_default("alice@x.com").unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), "alice@x.com");
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let token = tokens.issue("alice@x.com", Duration::seconds(-5)).unwrap();
        assert_invalid(tokens.verify(&token));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let forged = TokenService::with_secret(b"other-secret", Duration::minutes(30))
            .issue_default("alice@x.com")
            .unwrap();
        assert_invalid(service().verify(&forged));
    }

    #[test]
    fn garbage_and_tampered_tokens_are_rejected() {
        let tokens = service();
        assert_invalid(tokens.verify("garbage"));
        assert_invalid(tokens.verify("a.b.c"));
        assert_invalid(tokens.verify(""));

        let token = tokens.issue_default("alice@x.com").unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = "eyJzdWIiOiJtYWxsb3J5QHguY29tIiwiZXhwIjo0MTAyNDQ0ODAwLCJpYXQiOjB9";
        assert_invalid(tokens.verify(&parts.join(".")));
    }

    #[test]
    fn expired_and_forged_errors_are_indistinguishable() {
        let tokens = service();
        let expired = tokens
            .verify(&tokens.issue("alice@x.com", Duration::seconds(-5)).unwrap())
            .unwrap_err();
        let forged = tokens.verify("garbage").unwrap_err();
        assert_eq!(expired.to_string(), forged.to_string());
    }
}
