//! Per-resource role tables for the HTTP surface.
//!
//! Only `documents` declares a table; folders, shares and notifications are
//! undeclared and therefore open to any active member of the bound account.
//! Document sharing and downloads are guarded by the per-document access
//! check in the handlers, not by roles.

use docuvault_auth::{authorize, PolicySet, ResourcePolicy, Role};
use docuvault_core::DomainResult;
use docuvault_tenancy::TenantContext;

use crate::context::CurrentUser;

static DOCUMENTS: ResourcePolicy = ResourcePolicy::new(
    "documents",
    &[
        ("list", &[Role::User, Role::Manager, Role::Admin]),
        ("retrieve", &[Role::User, Role::Manager, Role::Admin]),
        ("create", &[Role::User, Role::Manager, Role::Admin]),
        ("upload", &[Role::User, Role::Manager, Role::Admin]),
        ("update", &[Role::Manager, Role::Admin]),
        ("partial_update", &[Role::Manager, Role::Admin]),
        ("archive", &[Role::Manager, Role::Admin]),
        ("destroy", &[Role::Admin]),
    ],
);

static POLICIES: PolicySet = PolicySet::new(&[DOCUMENTS]);

/// Tenant gate plus role gate for one action, against the tenant the
/// request is bound to.
pub fn require(user: &CurrentUser, resource: &str, action: &str) -> DomainResult<()> {
    authorize(
        user.membership(),
        TenantContext::current(),
        &POLICIES,
        resource,
        action,
    )
}
