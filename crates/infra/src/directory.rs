//! Account and profile directory.
//!
//! This is the platform-operator surface: it works across tenants on
//! purpose, reading through the raw stores rather than the scoped
//! wrapper. Everything else in the system goes through
//! [`crate::store::TenantScopedStore`].

use chrono::{DateTime, Utc};

use docuvault_auth::{Membership, Role};
use docuvault_core::{DomainError, DomainResult, ProfileId, TenantId, UserId};
use docuvault_tenancy::{Account, UserProfile};

use crate::store::TenantStore;

pub struct Directory<A, P> {
    accounts: A,
    profiles: P,
}

impl<A, P> Directory<A, P>
where
    A: TenantStore<TenantId, Account>,
    P: TenantStore<ProfileId, UserProfile>,
{
    pub fn new(accounts: A, profiles: P) -> Self {
        Self { accounts, profiles }
    }

    /// Creates an account. Slugs are unique across the platform.
    pub fn create_account(
        &self,
        name: &str,
        slug: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Account> {
        let account = Account::new(name, slug, now)?;
        let slug_taken = self
            .accounts
            .scan_all()
            .into_iter()
            .any(|(_, existing)| existing.slug == account.slug);
        if slug_taken {
            return Err(DomainError::conflict("account slug is already taken"));
        }
        self.accounts.upsert(account.id, account.id, account.clone());
        tracing::info!(account = %account.id, slug = %account.slug, "account created");
        Ok(account)
    }

    pub fn account(&self, id: TenantId) -> Option<Account> {
        self.accounts.get(id, &id)
    }

    /// All accounts, oldest first. Platform operators only.
    pub fn list_accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .scan_all()
            .into_iter()
            .map(|(_, account)| account)
            .collect();
        accounts.sort_by_key(|account| account.created_at);
        accounts
    }

    /// Soft-deactivates an account. Members keep their profiles but fail
    /// the tenant gate until the account is reactivated.
    pub fn deactivate_account(&self, id: TenantId, now: DateTime<Utc>) -> DomainResult<Account> {
        let mut account = self.account(id).ok_or(DomainError::NotFound)?;
        account.deactivate(now);
        self.accounts.upsert(account.id, account.id, account.clone());
        tracing::warn!(account = %account.id, "account deactivated");
        Ok(account)
    }

    /// Attaches a user to an account with a role. One profile per
    /// (user, account) pair.
    pub fn create_profile(
        &self,
        user_id: UserId,
        account_id: TenantId,
        role: Role,
        now: DateTime<Utc>,
    ) -> DomainResult<UserProfile> {
        if self.account(account_id).is_none() {
            return Err(DomainError::NotFound);
        }
        let already_member = self
            .profiles
            .list(account_id)
            .into_iter()
            .any(|profile| profile.user_id == user_id);
        if already_member {
            return Err(DomainError::conflict(
                "user already has a profile in this account",
            ));
        }
        let profile = UserProfile::new(user_id, account_id, role, now);
        self.profiles.upsert(account_id, profile.id, profile.clone());
        tracing::info!(
            account = %account_id,
            user = %user_id,
            role = %profile.role,
            "profile attached"
        );
        Ok(profile)
    }

    pub fn deactivate_profile(
        &self,
        profile_id: ProfileId,
        now: DateTime<Utc>,
    ) -> DomainResult<UserProfile> {
        let (tenant, mut profile) = self
            .profiles
            .scan_all()
            .into_iter()
            .find(|(_, profile)| profile.id == profile_id)
            .ok_or(DomainError::NotFound)?;
        profile.deactivate(now);
        self.profiles.upsert(tenant, profile_id, profile.clone());
        tracing::info!(account = %tenant, profile = %profile_id, "profile deactivated");
        Ok(profile)
    }

    /// Resolves the account a user acts in: their oldest active profile
    /// whose account is also active. `None` means the user has no tenant
    /// binding at all.
    pub fn resolve_membership(&self, user_id: UserId) -> Option<(Account, Membership)> {
        let mut candidates: Vec<(TenantId, UserProfile)> = self
            .profiles
            .scan_all()
            .into_iter()
            .filter(|(_, profile)| profile.user_id == user_id && profile.is_active)
            .collect();
        candidates.sort_by_key(|(_, profile)| profile.created_at);

        for (tenant, profile) in candidates {
            let Some(account) = self.account(tenant) else {
                continue;
            };
            if account.is_active {
                let membership = profile.membership(true);
                return Some((account, membership));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTenantStore;

    fn directory() -> Directory<
        InMemoryTenantStore<TenantId, Account>,
        InMemoryTenantStore<ProfileId, UserProfile>,
    > {
        Directory::new(InMemoryTenantStore::new(), InMemoryTenantStore::new())
    }

    #[test]
    fn slugs_are_unique_across_the_platform() {
        let directory = directory();
        let now = Utc::now();

        directory.create_account("Acme", "acme", now).unwrap();
        let duplicate = directory.create_account("Acme Two", "acme", now);

        assert!(matches!(duplicate, Err(DomainError::Conflict(_))));
        assert_eq!(directory.list_accounts().len(), 1);
    }

    #[test]
    fn profiles_attach_only_to_existing_accounts() {
        let directory = directory();
        let result =
            directory.create_profile(UserId::new(), TenantId::new(), Role::User, Utc::now());
        assert_eq!(result, Err(DomainError::NotFound));
    }

    #[test]
    fn one_profile_per_user_and_account() {
        let directory = directory();
        let now = Utc::now();
        let account = directory.create_account("Acme", "acme", now).unwrap();
        let user = UserId::new();

        directory
            .create_profile(user, account.id, Role::User, now)
            .unwrap();
        let second = directory.create_profile(user, account.id, Role::Admin, now);

        assert!(matches!(second, Err(DomainError::Conflict(_))));
    }

    #[test]
    fn membership_resolves_to_the_oldest_active_binding() {
        let directory = directory();
        let now = Utc::now();
        let user = UserId::new();

        let first = directory.create_account("First", "first", now).unwrap();
        let second = directory.create_account("Second", "second", now).unwrap();
        directory
            .create_profile(user, first.id, Role::Admin, now)
            .unwrap();
        directory
            .create_profile(
                user,
                second.id,
                Role::User,
                now + chrono::Duration::minutes(1),
            )
            .unwrap();

        let (account, membership) = directory.resolve_membership(user).unwrap();
        assert_eq!(account.id, first.id);
        assert_eq!(membership.role, Role::Admin);

        // Once the oldest account goes dark, resolution moves on.
        directory.deactivate_account(first.id, now).unwrap();
        let (account, membership) = directory.resolve_membership(user).unwrap();
        assert_eq!(account.id, second.id);
        assert_eq!(membership.role, Role::User);
    }

    #[test]
    fn deactivated_profile_resolves_to_nothing() {
        let directory = directory();
        let now = Utc::now();
        let user = UserId::new();
        let account = directory.create_account("Acme", "acme", now).unwrap();
        let profile = directory
            .create_profile(user, account.id, Role::Manager, now)
            .unwrap();

        assert!(directory.resolve_membership(user).is_some());

        directory.deactivate_profile(profile.id, now).unwrap();
        assert_eq!(directory.resolve_membership(user), None);
    }

    #[test]
    fn deactivate_profile_reaches_across_tenants() {
        let directory = directory();
        let now = Utc::now();
        let account = directory.create_account("Acme", "acme", now).unwrap();
        let profile = directory
            .create_profile(UserId::new(), account.id, Role::User, now)
            .unwrap();

        // The platform surface needs no tenant binding to find the row.
        let updated = directory.deactivate_profile(profile.id, now).unwrap();
        assert!(!updated.is_active);

        let missing = directory.deactivate_profile(ProfileId::new(), now);
        assert_eq!(missing, Err(DomainError::NotFound));
    }
}
