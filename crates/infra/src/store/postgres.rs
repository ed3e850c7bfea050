//! Postgres-backed tenant store.
//!
//! One table per store, schema managed by external migrations:
//!
//! ```sql
//! CREATE TABLE <table> (
//!     tenant_id  UUID        NOT NULL,
//!     row_key    TEXT        NOT NULL,
//!     data       JSONB       NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     PRIMARY KEY (tenant_id, row_key)
//! );
//! ```
//!
//! Values round-trip through JSONB via serde. Calls reach the pool through
//! [`bridge`], which parks the current worker with `block_in_place` before
//! driving the query, so the store is callable from async handler tasks.
//! Requires the multi-thread runtime.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{PgPool, Row};

use docuvault_core::{DocumentId, FolderId, NotificationId, ProfileId, ShareId, TenantId, UserId};

use super::TenantStore;

/// Run `fut` to completion on `handle` from synchronous store code.
///
/// `block_in_place` hands this worker's queue to another thread first, so
/// calling it inside a handler task does not deadlock or panic the runtime.
pub(crate) fn bridge<F: Future>(handle: &tokio::runtime::Handle, fut: F) -> F::Output {
    tokio::task::block_in_place(|| handle.block_on(fut))
}

/// Key types that can name a `row_key` column value.
pub trait StoreKey: Clone + Send + Sync {
    fn encode(&self) -> String;
}

macro_rules! impl_uuid_store_key {
    ($($name:ident),+ $(,)?) => {
        $(
            impl StoreKey for $name {
                fn encode(&self) -> String {
                    self.as_uuid().to_string()
                }
            }
        )+
    };
}

impl_uuid_store_key!(TenantId, UserId, ProfileId, FolderId, DocumentId, ShareId, NotificationId);

impl StoreKey for (UserId, FolderId) {
    fn encode(&self) -> String {
        format!("{}:{}", self.0, self.1)
    }
}

pub struct PostgresTenantStore<K, V> {
    pool: Arc<PgPool>,
    table: &'static str,
    _key: std::marker::PhantomData<K>,
    _value: std::marker::PhantomData<V>,
}

impl<K, V> PostgresTenantStore<K, V> {
    /// `table` must be one of the migrated store tables; it is interpolated
    /// into query text, never taken from input.
    pub fn new(pool: PgPool, table: &'static str) -> Self {
        Self {
            pool: Arc::new(pool),
            table,
            _key: std::marker::PhantomData,
            _value: std::marker::PhantomData,
        }
    }
}

impl<K, V> TenantStore<K, V> for PostgresTenantStore<K, V>
where
    K: StoreKey + 'static,
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let pool = self.pool.clone();
        let sql = format!("SELECT data FROM {} WHERE tenant_id = $1 AND row_key = $2", self.table);
        let row_key = key.encode();

        bridge(&handle, async move {
            match sqlx::query(&sql)
                .bind(tenant_id.as_uuid())
                .bind(&row_key)
                .fetch_optional(&*pool)
                .await
            {
                Ok(Some(row)) => row
                    .try_get::<serde_json::Value, _>("data")
                    .ok()
                    .and_then(|data| serde_json::from_value(data).ok()),
                Ok(None) => None,
                Err(_) => None,
            }
        })
    }

    fn insert(&self, tenant_id: TenantId, key: K, value: V) -> bool {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return false,
        };
        let data = match serde_json::to_value(&value) {
            Ok(d) => d,
            Err(_) => return false,
        };

        let pool = self.pool.clone();
        let sql = format!(
            "INSERT INTO {} (tenant_id, row_key, data) VALUES ($1, $2, $3) \
             ON CONFLICT (tenant_id, row_key) DO NOTHING",
            self.table
        );
        let row_key = key.encode();

        bridge(&handle, async move {
            match sqlx::query(&sql)
                .bind(tenant_id.as_uuid())
                .bind(&row_key)
                .bind(&data)
                .execute(&*pool)
                .await
            {
                Ok(result) => result.rows_affected() == 1,
                Err(_) => false,
            }
        })
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return,
        };
        let data = match serde_json::to_value(&value) {
            Ok(d) => d,
            Err(_) => return,
        };

        let pool = self.pool.clone();
        let sql = format!(
            "INSERT INTO {} (tenant_id, row_key, data) VALUES ($1, $2, $3) \
             ON CONFLICT (tenant_id, row_key) \
             DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()",
            self.table
        );
        let row_key = key.encode();

        let _ = bridge(&handle, async move {
            sqlx::query(&sql)
                .bind(tenant_id.as_uuid())
                .bind(&row_key)
                .bind(&data)
                .execute(&*pool)
                .await
        });
    }

    fn remove(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let pool = self.pool.clone();
        let sql = format!(
            "DELETE FROM {} WHERE tenant_id = $1 AND row_key = $2 RETURNING data",
            self.table
        );
        let row_key = key.encode();

        bridge(&handle, async move {
            match sqlx::query(&sql)
                .bind(tenant_id.as_uuid())
                .bind(&row_key)
                .fetch_optional(&*pool)
                .await
            {
                Ok(Some(row)) => row
                    .try_get::<serde_json::Value, _>("data")
                    .ok()
                    .and_then(|data| serde_json::from_value(data).ok()),
                _ => None,
            }
        })
    }

    fn list(&self, tenant_id: TenantId) -> Vec<V> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return vec![],
        };

        let pool = self.pool.clone();
        let sql = format!(
            "SELECT data FROM {} WHERE tenant_id = $1 ORDER BY updated_at",
            self.table
        );

        bridge(&handle, async move {
            match sqlx::query(&sql)
                .bind(tenant_id.as_uuid())
                .fetch_all(&*pool)
                .await
            {
                Ok(rows) => rows
                    .into_iter()
                    .filter_map(|row| {
                        row.try_get::<serde_json::Value, _>("data")
                            .ok()
                            .and_then(|data| serde_json::from_value(data).ok())
                    })
                    .collect(),
                Err(_) => vec![],
            }
        })
    }

    fn clear_tenant(&self, tenant_id: TenantId) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return,
        };

        let pool = self.pool.clone();
        let sql = format!("DELETE FROM {} WHERE tenant_id = $1", self.table);

        let _ = bridge(&handle, async move {
            sqlx::query(&sql)
                .bind(tenant_id.as_uuid())
                .execute(&*pool)
                .await
        });
    }

    fn scan_all(&self) -> Vec<(TenantId, V)> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return vec![],
        };

        let pool = self.pool.clone();
        let sql = format!("SELECT tenant_id, data FROM {} ORDER BY updated_at", self.table);

        bridge(&handle, async move {
            match sqlx::query(&sql).fetch_all(&*pool).await {
                Ok(rows) => rows
                    .into_iter()
                    .filter_map(|row| {
                        let tenant = row.try_get::<uuid::Uuid, _>("tenant_id").ok()?;
                        let data = row.try_get::<serde_json::Value, _>("data").ok()?;
                        let value = serde_json::from_value(data).ok()?;
                        Some((TenantId::from_uuid(tenant), value))
                    })
                    .collect(),
                Err(_) => vec![],
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::bridge;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn bridge_runs_inside_a_handler_task() {
        // Store calls happen from within async handlers; bridging must not
        // panic or deadlock the runtime there.
        let value = tokio::spawn(async {
            let handle = tokio::runtime::Handle::current();
            bridge(&handle, async { 21 * 2 })
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
    }
}
