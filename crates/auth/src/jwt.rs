//! Token decoding and signature verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::claims::{validate_claims, JwtClaims, TokenValidationError};

/// Verifies a bearer token and returns its claims.
///
/// Behind a trait so the boundary can swap key handling (rotating secrets,
/// asymmetric keys) without touching the middleware.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HS256 validator over a shared secret.
pub struct Hs256JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time-window checks run through `validate_claims` with an explicit
        // clock; the library's implicit wall-clock checks stay off.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenValidationError::Invalid(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
