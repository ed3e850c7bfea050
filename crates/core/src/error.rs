//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business/domain failures (validation,
/// conflicts, authorization). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No valid principal on the request.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The principal carries no active account binding, or an operation
    /// requiring a bound tenant ran without one.
    #[error("no tenant context")]
    NoTenantContext,

    /// The tenant gate passed but the action is not permitted.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A requested resource is absent. Rows owned by another tenant are
    /// reported through this same variant; callers cannot distinguish
    /// "does not exist" from "exists elsewhere".
    #[error("not found")]
    NotFound,

    /// A uniqueness or concurrent-update conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A lifecycle operation was attempted from a state that does not
    /// permit it.
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidStateTransition(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
