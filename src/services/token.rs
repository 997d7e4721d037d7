//! Service token generation
//!
//! Calls to the Activity Service authenticate with an anonymous RS256 token
//! signed by this service's private key.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};

/// Subject used for tokens that are not tied to a user
pub const ANONYMOUS_SUBJECT: &str = "anonymous";

pub trait TokenGenerator: Send + Sync {
    fn anonymous_token(&self) -> Result<String>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub did: String,
}

pub struct RsaTokenGenerator {
    key: EncodingKey,
    issuer: String,
    ttl_secs: i64,
}

impl RsaTokenGenerator {
    pub fn from_pem(pem: &[u8], issuer: impl Into<String>, ttl_secs: i64) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(pem)
            .map_err(|e| Error::Auth(format!("Invalid RSA private key: {}", e)))?;

        Ok(Self {
            key,
            issuer: issuer.into(),
            ttl_secs,
        })
    }

    /// Load the signing key from disk. A missing or malformed key is fatal at
    /// startup.
    pub fn from_file(path: impl AsRef<Path>, issuer: impl Into<String>, ttl_secs: i64) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read(path)
            .map_err(|e| Error::Auth(format!("Failed to read private key {}: {}", path.display(), e)))?;

        let generator = Self::from_pem(&pem, issuer, ttl_secs)?;
        info!(path = %path.display(), "Loaded token signing key");
        Ok(generator)
    }
}

impl TokenGenerator for RsaTokenGenerator {
    fn anonymous_token(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: ANONYMOUS_SUBJECT.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + self.ttl_secs,
            did: uuid::Uuid::new_v4().to_string(),
        };

        Ok(encode(&Header::new(Algorithm::RS256), &claims, &self.key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    const PRIVATE_KEY: &[u8] = include_bytes!("../../tests/fixtures/test_private_key.pem");
    const PUBLIC_KEY: &[u8] = include_bytes!("../../tests/fixtures/test_public_key.pem");

    #[test]
    fn test_anonymous_token_verifies_with_public_key() {
        let generator = RsaTokenGenerator::from_pem(PRIVATE_KEY, "user-service", 300).unwrap();
        let token = generator.anonymous_token().unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&["user-service"]);
        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_rsa_pem(PUBLIC_KEY).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, ANONYMOUS_SUBJECT);
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 300);
    }

    #[test]
    fn test_invalid_key_is_auth_error() {
        let err = RsaTokenGenerator::from_pem(b"not a key", "user-service", 300)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn test_missing_key_file_is_auth_error() {
        let err = RsaTokenGenerator::from_file("/nonexistent/key.pem", "user-service", 300)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Auth(_)));
    }
}
