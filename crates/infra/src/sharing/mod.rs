//! Sharing ledger: shares and their notifications, written together.
//!
//! Every share mutation produces a notification, and the two must land as
//! one unit: a rejected share insert leaves no notification behind, and a
//! transition never persists without its notification. The in-memory ledger
//! guarantees that with a single lock over both maps; the Postgres one with
//! a transaction.

mod in_memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use in_memory::InMemorySharingLedger;
#[cfg(feature = "postgres")]
pub use postgres::PostgresSharingLedger;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use docuvault_core::{DocumentId, DomainResult, NotificationId, ShareId, TenantId, UserId};
use docuvault_documents::{DocumentShare, ShareNotification};

pub trait SharingLedger: Send + Sync {
    /// Write a new pending share and its `share_received` notification as
    /// one unit. `Conflict` when any share for the same
    /// (document, recipient) already exists, whatever its status; nothing
    /// is written on failure. Both rows are stamped with `tenant_id`.
    fn create(
        &self,
        tenant_id: TenantId,
        share: DocumentShare,
        notification: ShareNotification,
        now: DateTime<Utc>,
    ) -> DomainResult<DocumentShare>;

    fn get_share(&self, tenant_id: TenantId, share_id: &ShareId) -> Option<DocumentShare>;
    /// All shares of the tenant, newest first.
    fn list_shares(&self, tenant_id: TenantId) -> Vec<DocumentShare>;
    fn shares_for_document(&self, tenant_id: TenantId, document_id: DocumentId) -> Vec<DocumentShare>;

    /// Persist a transitioned share together with the notification the
    /// transition produced, as one unit.
    fn apply_transition(
        &self,
        tenant_id: TenantId,
        share: DocumentShare,
        notification: ShareNotification,
    ) -> DomainResult<()>;

    /// Drop all shares of a destroyed document and their notifications.
    fn remove_shares_for_document(&self, tenant_id: TenantId, document_id: DocumentId) -> usize;

    fn get_notification(&self, tenant_id: TenantId, id: &NotificationId) -> Option<ShareNotification>;
    /// The recipient's inbox, newest first.
    fn notifications_for(&self, tenant_id: TenantId, recipient: UserId) -> Vec<ShareNotification>;
    fn update_notification(
        &self,
        tenant_id: TenantId,
        notification: ShareNotification,
    ) -> DomainResult<()>;

    /// Persist `expired` on every due share of the tenant. Returns the rows
    /// that changed.
    fn mark_expired_due(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Vec<DocumentShare>;
}

impl<L> SharingLedger for Arc<L>
where
    L: SharingLedger + ?Sized,
{
    fn create(
        &self,
        tenant_id: TenantId,
        share: DocumentShare,
        notification: ShareNotification,
        now: DateTime<Utc>,
    ) -> DomainResult<DocumentShare> {
        (**self).create(tenant_id, share, notification, now)
    }

    fn get_share(&self, tenant_id: TenantId, share_id: &ShareId) -> Option<DocumentShare> {
        (**self).get_share(tenant_id, share_id)
    }

    fn list_shares(&self, tenant_id: TenantId) -> Vec<DocumentShare> {
        (**self).list_shares(tenant_id)
    }

    fn shares_for_document(&self, tenant_id: TenantId, document_id: DocumentId) -> Vec<DocumentShare> {
        (**self).shares_for_document(tenant_id, document_id)
    }

    fn apply_transition(
        &self,
        tenant_id: TenantId,
        share: DocumentShare,
        notification: ShareNotification,
    ) -> DomainResult<()> {
        (**self).apply_transition(tenant_id, share, notification)
    }

    fn remove_shares_for_document(&self, tenant_id: TenantId, document_id: DocumentId) -> usize {
        (**self).remove_shares_for_document(tenant_id, document_id)
    }

    fn get_notification(&self, tenant_id: TenantId, id: &NotificationId) -> Option<ShareNotification> {
        (**self).get_notification(tenant_id, id)
    }

    fn notifications_for(&self, tenant_id: TenantId, recipient: UserId) -> Vec<ShareNotification> {
        (**self).notifications_for(tenant_id, recipient)
    }

    fn update_notification(
        &self,
        tenant_id: TenantId,
        notification: ShareNotification,
    ) -> DomainResult<()> {
        (**self).update_notification(tenant_id, notification)
    }

    fn mark_expired_due(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Vec<DocumentShare> {
        (**self).mark_expired_due(tenant_id, now)
    }
}
