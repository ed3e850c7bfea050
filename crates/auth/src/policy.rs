//! Declarative action-to-role tables.
//!
//! Each resource registers at most one [`ResourcePolicy`]: a static table
//! mapping action names to the roles allowed to perform them. The tables
//! are supplied at registration time and read literally; there is no
//! runtime discovery and no role hierarchy.

use crate::roles::Role;

/// Per-resource permission table.
///
/// Lookup rules:
/// - an action listed in the table is allowed exactly for the roles listed;
/// - an action *missing* from a declared table is denied for everyone.
///
/// Whether an undeclared resource allows or denies is decided by
/// [`PolicySet::allows`], not here.
#[derive(Debug, Clone, Copy)]
pub struct ResourcePolicy {
    resource: &'static str,
    rules: &'static [(&'static str, &'static [Role])],
}

impl ResourcePolicy {
    pub const fn new(
        resource: &'static str,
        rules: &'static [(&'static str, &'static [Role])],
    ) -> Self {
        Self { resource, rules }
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    /// Literal set membership. No role implies another.
    pub fn allows(&self, action: &str, role: Role) -> bool {
        self.rules
            .iter()
            .find(|(name, _)| *name == action)
            .map(|(_, roles)| roles.contains(&role))
            .unwrap_or(false)
    }
}

/// The full set of declared resource tables.
///
/// Resources that declare no table are open to any active member of the
/// tenant; restriction is an explicit per-resource opt-in.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicySet {
    policies: &'static [ResourcePolicy],
}

impl PolicySet {
    pub const fn new(policies: &'static [ResourcePolicy]) -> Self {
        Self { policies }
    }

    pub fn allows(&self, resource: &str, action: &str, role: Role) -> bool {
        match self.policies.iter().find(|p| p.resource() == resource) {
            Some(policy) => policy.allows(action, role),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static DOCS: ResourcePolicy = ResourcePolicy::new(
        "documents",
        &[
            ("list", &[Role::User, Role::Manager, Role::Admin]),
            ("archive", &[Role::Manager, Role::Admin]),
            ("destroy", &[Role::Admin]),
            ("review", &[Role::Manager]),
        ],
    );

    static SET: PolicySet = PolicySet::new(&[DOCS]);

    #[test]
    fn listed_roles_are_allowed() {
        assert!(SET.allows("documents", "list", Role::User));
        assert!(SET.allows("documents", "archive", Role::Manager));
        assert!(SET.allows("documents", "destroy", Role::Admin));
    }

    #[test]
    fn unlisted_roles_are_denied() {
        assert!(!SET.allows("documents", "archive", Role::User));
        assert!(!SET.allows("documents", "destroy", Role::Manager));
    }

    #[test]
    fn role_sets_are_literal_not_hierarchical() {
        // "review" names only manager; admin is denied because the table
        // is read as written.
        assert!(SET.allows("documents", "review", Role::Manager));
        assert!(!SET.allows("documents", "review", Role::Admin));
    }

    #[test]
    fn missing_action_in_declared_table_is_denied() {
        assert!(!SET.allows("documents", "purge", Role::Admin));
    }

    #[test]
    fn undeclared_resource_is_open_to_members() {
        assert!(SET.allows("folders", "list", Role::User));
    }
}
