use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docuvault_core::{DomainError, DomainResult, TenantId};

/// A tenant account: the root of isolation.
///
/// Accounts are created by platform operators and soft-deactivated rather
/// than deleted; every tenant-owned row points back at one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: TenantId,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(name: &str, slug: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("account name cannot be empty"));
        }
        if name.len() > 255 {
            return Err(DomainError::validation("account name too long"));
        }
        validate_slug(slug)?;

        Ok(Self {
            id: TenantId::new(),
            name: name.to_string(),
            slug: slug.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }

    pub fn reactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = true;
        self.updated_at = now;
    }
}

/// Slugs are lowercase ascii alphanumerics and single hyphens, hyphens
/// never leading or trailing.
fn validate_slug(slug: &str) -> DomainResult<()> {
    if slug.is_empty() || slug.len() > 63 {
        return Err(DomainError::validation("slug must be 1-63 characters"));
    }
    if slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
        return Err(DomainError::validation("slug has misplaced hyphens"));
    }
    if !slug
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(DomainError::validation(
            "slug may contain only lowercase letters, digits and hyphens",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_is_active() {
        let account = Account::new("Acme Corp", "acme-corp", Utc::now()).unwrap();
        assert!(account.is_active);
        assert_eq!(account.slug, "acme-corp");
    }

    #[test]
    fn name_is_trimmed_and_required() {
        assert!(Account::new("  ", "acme", Utc::now()).is_err());
        let account = Account::new("  Acme  ", "acme", Utc::now()).unwrap();
        assert_eq!(account.name, "Acme");
    }

    #[test]
    fn bad_slugs_are_rejected() {
        for slug in ["", "-acme", "acme-", "ac--me", "Acme", "acme corp", "a.b"] {
            assert!(Account::new("Acme", slug, Utc::now()).is_err(), "slug {slug:?}");
        }
    }

    #[test]
    fn deactivate_flips_the_flag() {
        let mut account = Account::new("Acme", "acme", Utc::now()).unwrap();
        account.deactivate(Utc::now());
        assert!(!account.is_active);
    }
}
