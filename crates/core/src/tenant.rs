//! Tenant ownership contract shared by all tenant-scoped entities.

use crate::id::TenantId;

/// Implemented by every entity that lives inside exactly one tenant.
///
/// The owning tenant is immutable for the lifetime of a stored row; the
/// setter exists so the scoped store can stamp the current tenant onto a
/// row at insert time, before the row is ever visible to readers.
pub trait TenantScoped {
    /// The tenant that owns this row.
    fn tenant_id(&self) -> TenantId;

    /// Stamp the owning tenant. Called on the insert path only.
    fn assign_tenant(&mut self, tenant_id: TenantId);
}
