//! `docuvault-auth` — pure authentication/authorization boundary (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorizer;
pub mod claims;
pub mod jwt;
pub mod policy;
pub mod roles;

pub use authorizer::{authorize, role_gate, tenant_gate, Membership};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use policy::{PolicySet, ResourcePolicy};
pub use roles::Role;
