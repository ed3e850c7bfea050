//! `docuvault-tenancy` — the tenancy boundary.
//!
//! Holds the execution-scoped tenant binding plus the two entities that
//! define it: the account (the tenant itself) and the user profile linking
//! a principal to one account with a role.

pub mod account;
pub mod context;
pub mod profile;

pub use account::Account;
pub use context::TenantContext;
pub use profile::UserProfile;
