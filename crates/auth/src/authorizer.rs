use docuvault_core::{DomainError, DomainResult, ProfileId, TenantId, UserId};

use crate::policy::PolicySet;
use crate::roles::Role;

/// A principal's resolved membership in one account.
///
/// Construction is intentionally decoupled from storage and transport: the
/// boundary resolves the authenticated user's profile once per request and
/// hands the snapshot here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub profile_id: ProfileId,
    pub user_id: UserId,
    pub account_id: TenantId,
    pub role: Role,
    pub profile_active: bool,
    pub account_active: bool,
}

/// The tenant gate: an active profile in an active account, matching the
/// tenant the operation is bound to.
///
/// Runs before any role logic. A missing or inactive binding denies
/// unconditionally.
pub fn tenant_gate<'m>(
    membership: Option<&'m Membership>,
    bound_tenant: Option<TenantId>,
) -> DomainResult<&'m Membership> {
    let membership = membership.ok_or(DomainError::NoTenantContext)?;
    if !membership.profile_active || !membership.account_active {
        return Err(DomainError::NoTenantContext);
    }
    let tenant = bound_tenant.ok_or(DomainError::NoTenantContext)?;
    if membership.account_id != tenant {
        return Err(DomainError::forbidden("tenant mismatch"));
    }
    Ok(membership)
}

/// The role gate: literal lookup against the declared tables.
pub fn role_gate(
    policies: &PolicySet,
    resource: &str,
    action: &str,
    role: Role,
) -> DomainResult<()> {
    if policies.allows(resource, action, role) {
        Ok(())
    } else {
        Err(DomainError::forbidden(format!("{action} on {resource}")))
    }
}

/// Authorize one action.
///
/// - No IO
/// - No panics
/// - Two independent predicates, evaluated in order: tenant gate, role gate.
pub fn authorize(
    membership: Option<&Membership>,
    bound_tenant: Option<TenantId>,
    policies: &PolicySet,
    resource: &str,
    action: &str,
) -> DomainResult<()> {
    let membership = tenant_gate(membership, bound_tenant)?;
    role_gate(policies, resource, action, membership.role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ResourcePolicy;

    static REPORTS: ResourcePolicy = ResourcePolicy::new(
        "reports",
        &[
            ("list", &[Role::User, Role::Manager, Role::Admin]),
            ("export", &[Role::Manager, Role::Admin]),
        ],
    );

    static POLICIES: PolicySet = PolicySet::new(&[REPORTS]);

    fn membership(role: Role) -> Membership {
        Membership {
            profile_id: ProfileId::new(),
            user_id: UserId::new(),
            account_id: TenantId::new(),
            role,
            profile_active: true,
            account_active: true,
        }
    }

    #[test]
    fn active_member_passes_both_gates() {
        let m = membership(Role::Manager);
        let result = authorize(Some(&m), Some(m.account_id), &POLICIES, "reports", "export");
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn missing_membership_is_no_tenant_context() {
        let result = authorize(None, Some(TenantId::new()), &POLICIES, "reports", "list");
        assert_eq!(result, Err(DomainError::NoTenantContext));
    }

    #[test]
    fn inactive_profile_fails_the_tenant_gate() {
        let mut m = membership(Role::Admin);
        m.profile_active = false;
        let result = authorize(Some(&m), Some(m.account_id), &POLICIES, "reports", "list");
        assert_eq!(result, Err(DomainError::NoTenantContext));
    }

    #[test]
    fn deactivated_account_fails_the_tenant_gate() {
        let mut m = membership(Role::Admin);
        m.account_active = false;
        let result = authorize(Some(&m), Some(m.account_id), &POLICIES, "reports", "list");
        assert_eq!(result, Err(DomainError::NoTenantContext));
    }

    #[test]
    fn unbound_tenant_fails_the_tenant_gate() {
        let m = membership(Role::Admin);
        let result = authorize(Some(&m), None, &POLICIES, "reports", "list");
        assert_eq!(result, Err(DomainError::NoTenantContext));
    }

    #[test]
    fn foreign_tenant_binding_is_forbidden() {
        let m = membership(Role::Admin);
        let result = authorize(Some(&m), Some(TenantId::new()), &POLICIES, "reports", "list");
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[test]
    fn role_outside_the_declared_set_is_forbidden() {
        let m = membership(Role::User);
        let result = authorize(Some(&m), Some(m.account_id), &POLICIES, "reports", "export");
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }
}
