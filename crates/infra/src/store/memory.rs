use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use docuvault_core::TenantId;

use super::TenantStore;

/// In-memory tenant-isolated store. The default backend, also used by
/// tests; rows live in one map keyed by (tenant, key) so a lookup can never
/// straddle tenants.
#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    inner: RwLock<HashMap<(TenantId, K), V>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(&(tenant_id, key.clone())).cloned()
    }

    fn insert(&self, tenant_id: TenantId, key: K, value: V) -> bool {
        let mut map = match self.inner.write() {
            Ok(m) => m,
            Err(_) => return false,
        };
        match map.entry((tenant_id, key)) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((tenant_id, key), value);
        }
    }

    fn remove(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        let mut map = self.inner.write().ok()?;
        map.remove(&(tenant_id, key.clone()))
    }

    fn list(&self, tenant_id: TenantId) -> Vec<V> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        map.iter()
            .filter_map(|((t, _k), v)| if *t == tenant_id { Some(v.clone()) } else { None })
            .collect()
    }

    fn clear_tenant(&self, tenant_id: TenantId) {
        if let Ok(mut map) = self.inner.write() {
            map.retain(|(t, _k), _v| *t != tenant_id);
        }
    }

    fn scan_all(&self) -> Vec<(TenantId, V)> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        map.iter().map(|((t, _k), v)| (*t, v.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_keyed_by_tenant_and_key() {
        let store: InMemoryTenantStore<u32, String> = InMemoryTenantStore::new();
        let t1 = TenantId::new();
        let t2 = TenantId::new();

        store.upsert(t1, 1, "one".to_string());
        store.upsert(t2, 1, "uno".to_string());

        assert_eq!(store.get(t1, &1), Some("one".to_string()));
        assert_eq!(store.get(t2, &1), Some("uno".to_string()));
        assert_eq!(store.list(t1), vec!["one".to_string()]);
    }

    #[test]
    fn insert_refuses_to_overwrite() {
        let store: InMemoryTenantStore<u32, String> = InMemoryTenantStore::new();
        let tenant = TenantId::new();

        assert!(store.insert(tenant, 1, "first".to_string()));
        assert!(!store.insert(tenant, 1, "second".to_string()));
        assert_eq!(store.get(tenant, &1), Some("first".to_string()));
    }

    #[test]
    fn remove_returns_the_row_once() {
        let store: InMemoryTenantStore<u32, String> = InMemoryTenantStore::new();
        let tenant = TenantId::new();

        store.upsert(tenant, 7, "x".to_string());
        assert_eq!(store.remove(tenant, &7), Some("x".to_string()));
        assert_eq!(store.remove(tenant, &7), None);
    }

    #[test]
    fn clear_tenant_leaves_other_tenants_alone() {
        let store: InMemoryTenantStore<u32, String> = InMemoryTenantStore::new();
        let t1 = TenantId::new();
        let t2 = TenantId::new();

        store.upsert(t1, 1, "a".to_string());
        store.upsert(t2, 1, "b".to_string());
        store.clear_tenant(t1);

        assert!(store.list(t1).is_empty());
        assert_eq!(store.list(t2).len(), 1);
        assert_eq!(store.scan_all().len(), 1);
    }
}
