//! Context-scoped decorator over [`TenantStore`].
//!
//! Reads filter by the tenant bound to the calling task and come back empty
//! when none is bound. Writes refuse to run unbound, and stamp the bound
//! tenant onto the row before it is stored, so a payload carrying some other
//! tenant id still lands in the caller's own namespace. Rows owned by
//! another tenant are invisible here; probing for them reads as `NotFound`.

use std::marker::PhantomData;

use docuvault_core::{DomainError, DomainResult, TenantId, TenantScoped};
use docuvault_tenancy::TenantContext;

use super::TenantStore;

/// The store the application layer talks to. Cross-tenant access exists
/// only through [`TenantScopedStore::all_tenants`], which is named so that
/// every use is easy to find.
pub struct TenantScopedStore<K, V, S> {
    raw: S,
    _marker: PhantomData<fn(K) -> V>,
}

impl<K, V, S> TenantScopedStore<K, V, S>
where
    S: TenantStore<K, V>,
    V: TenantScoped + Clone,
{
    pub fn new(raw: S) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Read one row in the bound tenant. `None` when the row is absent,
    /// owned by another tenant, or no tenant is bound.
    pub fn get(&self, key: &K) -> Option<V> {
        let tenant = TenantContext::current()?;
        self.raw.get(tenant, key)
    }

    /// [`TenantScopedStore::get`] with absence turned into `NotFound`.
    pub fn require(&self, key: &K) -> DomainResult<V> {
        self.get(key).ok_or(DomainError::NotFound)
    }

    /// All rows of the bound tenant; empty when unbound.
    pub fn list(&self) -> Vec<V> {
        match TenantContext::current() {
            Some(tenant) => self.raw.list(tenant),
            None => Vec::new(),
        }
    }

    /// Insert a new row under the bound tenant, stamping the tenant onto
    /// the value. `Conflict` when the key already exists for this tenant.
    pub fn insert(&self, key: K, mut value: V) -> DomainResult<V> {
        let tenant = TenantContext::require()?;
        value.assign_tenant(tenant);
        if self.raw.insert(tenant, key, value.clone()) {
            Ok(value)
        } else {
            Err(DomainError::conflict("a row with this key already exists"))
        }
    }

    /// Write a row under the bound tenant, stamping the tenant onto the
    /// value and replacing any existing row for the key.
    pub fn upsert(&self, key: K, mut value: V) -> DomainResult<V> {
        let tenant = TenantContext::require()?;
        value.assign_tenant(tenant);
        self.raw.upsert(tenant, key, value.clone());
        Ok(value)
    }

    /// Delete a row of the bound tenant. Rows that are absent or owned by
    /// another tenant both read as `NotFound`.
    pub fn remove(&self, key: &K) -> DomainResult<V> {
        let tenant = TenantContext::require()?;
        self.raw.remove(tenant, key).ok_or(DomainError::NotFound)
    }

    /// Administrative escape hatch: every row of every tenant, ignoring the
    /// context entirely.
    pub fn all_tenants(&self) -> Vec<(TenantId, V)> {
        self.raw.scan_all()
    }
}
