use docuvault_auth::Membership;
use docuvault_core::{TenantId, UserId};

/// The authenticated caller, attached as a request extension by the auth
/// middleware.
///
/// `membership` is the caller's resolved binding to an account, `None` for
/// principals that belong to no account (platform operators in particular).
/// Tenant-scoped routes fail closed on a missing membership; the admin
/// surface never needs one.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    user_id: UserId,
    platform: bool,
    membership: Option<Membership>,
}

impl CurrentUser {
    pub fn new(user_id: UserId, platform: bool, membership: Option<Membership>) -> Self {
        Self {
            user_id,
            platform,
            membership,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Cross-tenant administrative access. Comes from the token alone and
    /// never implies any in-tenant role.
    pub fn is_platform_operator(&self) -> bool {
        self.platform
    }

    pub fn membership(&self) -> Option<&Membership> {
        self.membership.as_ref()
    }

    /// The account this request is bound to, if any.
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.membership.as_ref().map(|m| m.account_id)
    }
}
