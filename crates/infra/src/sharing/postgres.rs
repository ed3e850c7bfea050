//! Postgres sharing ledger.
//!
//! Schema managed by external migrations:
//!
//! ```sql
//! CREATE TABLE document_shares (
//!     tenant_id   UUID        NOT NULL,
//!     share_id    UUID        NOT NULL,
//!     document_id UUID        NOT NULL,
//!     shared_with UUID        NOT NULL,
//!     status      TEXT        NOT NULL,
//!     expires_at  TIMESTAMPTZ,
//!     shared_at   TIMESTAMPTZ NOT NULL,
//!     data        JSONB       NOT NULL,
//!     updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     PRIMARY KEY (tenant_id, share_id)
//! );
//! CREATE TABLE share_notifications (
//!     tenant_id       UUID        NOT NULL,
//!     notification_id UUID        NOT NULL,
//!     recipient       UUID        NOT NULL,
//!     share_id        UUID        NOT NULL,
//!     data            JSONB       NOT NULL,
//!     created_at      TIMESTAMPTZ NOT NULL,
//!     PRIMARY KEY (tenant_id, notification_id)
//! );
//! ```
//!
//! Share/notification pairs are committed inside one transaction. Calls
//! reach the pool through [`crate::store::postgres::bridge`], so they are
//! callable from async handler tasks on the multi-thread runtime.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use docuvault_core::{
    DocumentId, DomainError, DomainResult, NotificationId, ShareId, TenantId, TenantScoped, UserId,
};
use docuvault_documents::{DocumentShare, ShareNotification};

use super::SharingLedger;
use crate::store::postgres::bridge;

pub struct PostgresSharingLedger {
    pool: Arc<PgPool>,
}

impl PostgresSharingLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    fn storage_err(context: &str) -> DomainError {
        DomainError::conflict(format!("sharing ledger unavailable: {context}"))
    }
}

async fn upsert_share(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    share: &DocumentShare,
) -> Result<(), sqlx::Error> {
    let data = serde_json::to_value(share).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    sqlx::query(
        r#"
        INSERT INTO document_shares (
            tenant_id, share_id, document_id, shared_with, status, expires_at, shared_at, data
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (tenant_id, share_id)
        DO UPDATE SET
            status = EXCLUDED.status,
            expires_at = EXCLUDED.expires_at,
            data = EXCLUDED.data,
            updated_at = NOW()
        "#,
    )
    .bind(share.tenant_id.as_uuid())
    .bind(share.id.as_uuid())
    .bind(share.document_id.as_uuid())
    .bind(share.shared_with.as_uuid())
    .bind(share.status.as_str())
    .bind(share.expires_at)
    .bind(share.shared_at)
    .bind(&data)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_notification(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    notification: &ShareNotification,
) -> Result<(), sqlx::Error> {
    let data = serde_json::to_value(notification).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    sqlx::query(
        r#"
        INSERT INTO share_notifications (
            tenant_id, notification_id, recipient, share_id, data, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (tenant_id, notification_id)
        DO UPDATE SET data = EXCLUDED.data
        "#,
    )
    .bind(notification.tenant_id.as_uuid())
    .bind(notification.id.as_uuid())
    .bind(notification.recipient.as_uuid())
    .bind(notification.share_id.as_uuid())
    .bind(&data)
    .bind(notification.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn decode_share(row: &sqlx::postgres::PgRow) -> Option<DocumentShare> {
    row.try_get::<serde_json::Value, _>("data")
        .ok()
        .and_then(|data| serde_json::from_value(data).ok())
}

fn decode_notification(row: &sqlx::postgres::PgRow) -> Option<ShareNotification> {
    row.try_get::<serde_json::Value, _>("data")
        .ok()
        .and_then(|data| serde_json::from_value(data).ok())
}

impl SharingLedger for PostgresSharingLedger {
    fn create(
        &self,
        tenant_id: TenantId,
        mut share: DocumentShare,
        mut notification: ShareNotification,
        _now: DateTime<Utc>,
    ) -> DomainResult<DocumentShare> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| Self::storage_err("no runtime"))?;
        let pool = self.pool.clone();

        share.assign_tenant(tenant_id);
        notification.assign_tenant(tenant_id);

        bridge(&handle, async move {
            let mut tx = pool
                .begin()
                .await
                .map_err(|_| Self::storage_err("begin failed"))?;

            // (document, shared_with) is unique regardless of status.
            let existing = sqlx::query(
                r#"
                SELECT 1 AS one FROM document_shares
                WHERE tenant_id = $1
                  AND document_id = $2
                  AND shared_with = $3
                LIMIT 1
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(share.document_id.as_uuid())
            .bind(share.shared_with.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|_| Self::storage_err("duplicate check failed"))?;

            if existing.is_some() {
                return Err(DomainError::conflict(
                    "document is already shared with this user",
                ));
            }

            upsert_share(&mut tx, &share)
                .await
                .map_err(|_| Self::storage_err("share insert failed"))?;
            insert_notification(&mut tx, &notification)
                .await
                .map_err(|_| Self::storage_err("notification insert failed"))?;

            tx.commit()
                .await
                .map_err(|_| Self::storage_err("commit failed"))?;
            Ok(share)
        })
    }

    fn get_share(&self, tenant_id: TenantId, share_id: &ShareId) -> Option<DocumentShare> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let pool = self.pool.clone();
        let share_id = *share_id;

        bridge(&handle, async move {
            sqlx::query("SELECT data FROM document_shares WHERE tenant_id = $1 AND share_id = $2")
                .bind(tenant_id.as_uuid())
                .bind(share_id.as_uuid())
                .fetch_optional(&*pool)
                .await
                .ok()
                .flatten()
                .and_then(|row| decode_share(&row))
        })
    }

    fn list_shares(&self, tenant_id: TenantId) -> Vec<DocumentShare> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return vec![],
        };
        let pool = self.pool.clone();

        bridge(&handle, async move {
            match sqlx::query(
                "SELECT data FROM document_shares WHERE tenant_id = $1 ORDER BY shared_at DESC",
            )
            .bind(tenant_id.as_uuid())
            .fetch_all(&*pool)
            .await
            {
                Ok(rows) => rows.iter().filter_map(decode_share).collect(),
                Err(_) => vec![],
            }
        })
    }

    fn shares_for_document(&self, tenant_id: TenantId, document_id: DocumentId) -> Vec<DocumentShare> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return vec![],
        };
        let pool = self.pool.clone();

        bridge(&handle, async move {
            match sqlx::query(
                r#"
                SELECT data FROM document_shares
                WHERE tenant_id = $1 AND document_id = $2
                ORDER BY shared_at DESC
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(document_id.as_uuid())
            .fetch_all(&*pool)
            .await
            {
                Ok(rows) => rows.iter().filter_map(decode_share).collect(),
                Err(_) => vec![],
            }
        })
    }

    fn apply_transition(
        &self,
        tenant_id: TenantId,
        mut share: DocumentShare,
        mut notification: ShareNotification,
    ) -> DomainResult<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| Self::storage_err("no runtime"))?;
        let pool = self.pool.clone();

        share.assign_tenant(tenant_id);
        notification.assign_tenant(tenant_id);

        bridge(&handle, async move {
            let mut tx = pool
                .begin()
                .await
                .map_err(|_| Self::storage_err("begin failed"))?;
            upsert_share(&mut tx, &share)
                .await
                .map_err(|_| Self::storage_err("share update failed"))?;
            insert_notification(&mut tx, &notification)
                .await
                .map_err(|_| Self::storage_err("notification insert failed"))?;
            tx.commit()
                .await
                .map_err(|_| Self::storage_err("commit failed"))
        })
    }

    fn remove_shares_for_document(&self, tenant_id: TenantId, document_id: DocumentId) -> usize {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return 0,
        };
        let pool = self.pool.clone();

        bridge(&handle, async move {
            let mut tx = match pool.begin().await {
                Ok(tx) => tx,
                Err(_) => return 0,
            };

            let _ = sqlx::query(
                r#"
                DELETE FROM share_notifications
                WHERE tenant_id = $1 AND share_id IN (
                    SELECT share_id FROM document_shares
                    WHERE tenant_id = $1 AND document_id = $2
                )
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(document_id.as_uuid())
            .execute(&mut *tx)
            .await;

            let removed = sqlx::query(
                "DELETE FROM document_shares WHERE tenant_id = $1 AND document_id = $2",
            )
            .bind(tenant_id.as_uuid())
            .bind(document_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map(|r| r.rows_affected() as usize)
            .unwrap_or(0);

            match tx.commit().await {
                Ok(()) => removed,
                Err(_) => 0,
            }
        })
    }

    fn get_notification(&self, tenant_id: TenantId, id: &NotificationId) -> Option<ShareNotification> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let pool = self.pool.clone();
        let id = *id;

        bridge(&handle, async move {
            sqlx::query(
                "SELECT data FROM share_notifications WHERE tenant_id = $1 AND notification_id = $2",
            )
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&*pool)
            .await
            .ok()
            .flatten()
            .and_then(|row| decode_notification(&row))
        })
    }

    fn notifications_for(&self, tenant_id: TenantId, recipient: UserId) -> Vec<ShareNotification> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return vec![],
        };
        let pool = self.pool.clone();

        bridge(&handle, async move {
            match sqlx::query(
                r#"
                SELECT data FROM share_notifications
                WHERE tenant_id = $1 AND recipient = $2
                ORDER BY created_at DESC
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(recipient.as_uuid())
            .fetch_all(&*pool)
            .await
            {
                Ok(rows) => rows.iter().filter_map(decode_notification).collect(),
                Err(_) => vec![],
            }
        })
    }

    fn update_notification(
        &self,
        tenant_id: TenantId,
        mut notification: ShareNotification,
    ) -> DomainResult<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| Self::storage_err("no runtime"))?;
        let pool = self.pool.clone();

        notification.assign_tenant(tenant_id);

        bridge(&handle, async move {
            let mut tx = pool
                .begin()
                .await
                .map_err(|_| Self::storage_err("begin failed"))?;
            insert_notification(&mut tx, &notification)
                .await
                .map_err(|_| Self::storage_err("notification update failed"))?;
            tx.commit()
                .await
                .map_err(|_| Self::storage_err("commit failed"))
        })
    }

    fn mark_expired_due(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Vec<DocumentShare> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return vec![],
        };
        let pool = self.pool.clone();

        bridge(&handle, async move {
            let mut tx = match pool.begin().await {
                Ok(tx) => tx,
                Err(_) => return vec![],
            };

            let due = match sqlx::query(
                r#"
                SELECT data FROM document_shares
                WHERE tenant_id = $1
                  AND status IN ('pending', 'accepted')
                  AND expires_at IS NOT NULL
                  AND expires_at < $2
                FOR UPDATE
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(now)
            .fetch_all(&mut *tx)
            .await
            {
                Ok(rows) => rows,
                Err(_) => return vec![],
            };

            let mut transitioned = Vec::new();
            for row in &due {
                let Some(mut share) = decode_share(row) else {
                    continue;
                };
                if !share.mark_expired(now) {
                    continue;
                }
                if upsert_share(&mut tx, &share).await.is_err() {
                    return vec![];
                }
                transitioned.push(share);
            }

            match tx.commit().await {
                Ok(()) => transitioned,
                Err(_) => vec![],
            }
        })
    }
}
