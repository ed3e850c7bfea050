use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docuvault_auth::{Membership, Role};
use docuvault_core::{ProfileId, TenantId, TenantScoped, UserId};

/// Membership of one user in one account.
///
/// A user holds at most one profile per account; the profile carries the
/// role every authorization decision inside that account reads. Profiles
/// are deactivated on offboarding, never hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub account_id: TenantId,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: UserId, account_id: TenantId, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            id: ProfileId::new(),
            user_id,
            account_id,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn change_role(&mut self, role: Role, now: DateTime<Utc>) {
        self.role = role;
        self.updated_at = now;
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }

    /// Snapshot handed to the authorizer, paired with the owning account's
    /// active flag resolved by the caller.
    pub fn membership(&self, account_active: bool) -> Membership {
        Membership {
            profile_id: self.id,
            user_id: self.user_id,
            account_id: self.account_id,
            role: self.role,
            profile_active: self.is_active,
            account_active,
        }
    }
}

impl TenantScoped for UserProfile {
    fn tenant_id(&self) -> TenantId {
        self.account_id
    }

    fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.account_id = tenant_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_snapshot_reflects_profile_state() {
        let now = Utc::now();
        let mut profile = UserProfile::new(UserId::new(), TenantId::new(), Role::Manager, now);

        let m = profile.membership(true);
        assert_eq!(m.role, Role::Manager);
        assert!(m.profile_active && m.account_active);

        profile.deactivate(now);
        assert!(!profile.membership(true).profile_active);
    }

    #[test]
    fn role_change_touches_updated_at() {
        let created = Utc::now();
        let mut profile = UserProfile::new(UserId::new(), TenantId::new(), Role::User, created);
        let later = created + chrono::Duration::minutes(5);
        profile.change_role(Role::Admin, later);
        assert_eq!(profile.role, Role::Admin);
        assert_eq!(profile.updated_at, later);
    }
}
