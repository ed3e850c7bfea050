//! Tenant-keyed storage.
//!
//! [`TenantStore`] is the raw capability: every call names its tenant
//! explicitly. [`TenantScopedStore`] is the decorator the rest of the system
//! uses, deriving the tenant from [`docuvault_tenancy::TenantContext`] and
//! failing closed when none is bound.

mod memory;
#[cfg(feature = "postgres")]
pub(crate) mod postgres;
mod scoped;

pub use memory::InMemoryTenantStore;
#[cfg(feature = "postgres")]
pub use postgres::{PostgresTenantStore, StoreKey};
pub use scoped::TenantScopedStore;

use std::sync::Arc;

use docuvault_core::TenantId;

/// Tenant-isolated key/value store abstraction.
pub trait TenantStore<K, V>: Send + Sync {
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V>;
    /// Insert a new row. Returns `false` (leaving the stored row untouched)
    /// when the key is already present for this tenant.
    fn insert(&self, tenant_id: TenantId, key: K, value: V) -> bool;
    fn upsert(&self, tenant_id: TenantId, key: K, value: V);
    fn remove(&self, tenant_id: TenantId, key: &K) -> Option<V>;
    fn list(&self, tenant_id: TenantId) -> Vec<V>;
    /// Clear all records for a tenant (rebuild support).
    fn clear_tenant(&self, tenant_id: TenantId);
    /// Cross-tenant scan. Administrative callers only; everything else goes
    /// through [`TenantScopedStore`].
    fn scan_all(&self) -> Vec<(TenantId, V)>;
}

impl<K, V, S> TenantStore<K, V> for Arc<S>
where
    S: TenantStore<K, V> + ?Sized,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        (**self).get(tenant_id, key)
    }

    fn insert(&self, tenant_id: TenantId, key: K, value: V) -> bool {
        (**self).insert(tenant_id, key, value)
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        (**self).upsert(tenant_id, key, value)
    }

    fn remove(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        (**self).remove(tenant_id, key)
    }

    fn list(&self, tenant_id: TenantId) -> Vec<V> {
        (**self).list(tenant_id)
    }

    fn clear_tenant(&self, tenant_id: TenantId) {
        (**self).clear_tenant(tenant_id)
    }

    fn scan_all(&self) -> Vec<(TenantId, V)> {
        (**self).scan_all()
    }
}
