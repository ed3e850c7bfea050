//! HTTP surface of the document backend.
//!
//! Request flow: bearer token -> [`middleware::auth_middleware`] validates it
//! and resolves the caller's account membership -> the whole handler runs
//! inside a [`docuvault_tenancy::TenantContext`] scope bound to that account.
//! Handlers never pass tenant ids around; the scoped stores pick the tenant
//! up from the context.

pub mod app;
pub mod authz;
pub mod context;
pub mod middleware;
