use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use docuvault_core::UserId;

/// JWT claims model.
///
/// Tokens carry identity only. Which account the user acts in, and with
/// what role, is resolved from their stored profile at request time, so
/// role changes and deactivations take effect without re-issuing tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// Platform operator flag. Grants access to the cross-tenant
    /// administrative surface only; never implies any in-tenant role.
    #[serde(default)]
    pub platform: bool,

    /// Issued-at timestamp.
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("token rejected: {0}")]
    Invalid(String),
}

/// Deterministically validate JWT claims against a supplied clock.
///
/// Signature verification / decoding happens in [`crate::jwt`]; keeping the
/// time-window rules here makes them testable without key material.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
