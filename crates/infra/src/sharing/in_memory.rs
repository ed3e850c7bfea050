use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use docuvault_core::{
    DocumentId, DomainError, DomainResult, NotificationId, ShareId, TenantId, TenantScoped, UserId,
};
use docuvault_documents::{DocumentShare, ShareNotification};

use super::SharingLedger;

#[derive(Debug, Default)]
struct LedgerState {
    shares: HashMap<(TenantId, ShareId), DocumentShare>,
    notifications: HashMap<(TenantId, NotificationId), ShareNotification>,
}

/// In-memory sharing ledger. One lock covers shares and notifications, so
/// a writer commits both rows or neither.
#[derive(Debug, Default)]
pub struct InMemorySharingLedger {
    inner: RwLock<LedgerState>,
}

impl InMemorySharingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err() -> DomainError {
        DomainError::conflict("sharing ledger lock poisoned")
    }
}

impl SharingLedger for InMemorySharingLedger {
    fn create(
        &self,
        tenant_id: TenantId,
        mut share: DocumentShare,
        mut notification: ShareNotification,
        _now: DateTime<Utc>,
    ) -> DomainResult<DocumentShare> {
        let mut state = self.inner.write().map_err(|_| Self::lock_err())?;

        // (document, shared_with) is unique regardless of status: a dead
        // row still blocks a new invitation.
        let duplicate = state.shares.values().any(|existing| {
            existing.tenant_id == tenant_id
                && existing.document_id == share.document_id
                && existing.shared_with == share.shared_with
        });
        if duplicate {
            return Err(DomainError::conflict(
                "document is already shared with this user",
            ));
        }

        share.assign_tenant(tenant_id);
        notification.assign_tenant(tenant_id);
        state.shares.insert((tenant_id, share.id), share.clone());
        state
            .notifications
            .insert((tenant_id, notification.id), notification);
        Ok(share)
    }

    fn get_share(&self, tenant_id: TenantId, share_id: &ShareId) -> Option<DocumentShare> {
        let state = self.inner.read().ok()?;
        state.shares.get(&(tenant_id, *share_id)).cloned()
    }

    fn list_shares(&self, tenant_id: TenantId) -> Vec<DocumentShare> {
        let state = match self.inner.read() {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        let mut shares: Vec<DocumentShare> = state
            .shares
            .iter()
            .filter_map(|((t, _), s)| if *t == tenant_id { Some(s.clone()) } else { None })
            .collect();
        shares.sort_by(|a, b| b.shared_at.cmp(&a.shared_at));
        shares
    }

    fn shares_for_document(&self, tenant_id: TenantId, document_id: DocumentId) -> Vec<DocumentShare> {
        self.list_shares(tenant_id)
            .into_iter()
            .filter(|s| s.document_id == document_id)
            .collect()
    }

    fn apply_transition(
        &self,
        tenant_id: TenantId,
        mut share: DocumentShare,
        mut notification: ShareNotification,
    ) -> DomainResult<()> {
        let mut state = self.inner.write().map_err(|_| Self::lock_err())?;

        share.assign_tenant(tenant_id);
        notification.assign_tenant(tenant_id);
        state.shares.insert((tenant_id, share.id), share);
        state
            .notifications
            .insert((tenant_id, notification.id), notification);
        Ok(())
    }

    fn remove_shares_for_document(&self, tenant_id: TenantId, document_id: DocumentId) -> usize {
        let mut state = match self.inner.write() {
            Ok(s) => s,
            Err(_) => return 0,
        };

        let doomed: Vec<ShareId> = state
            .shares
            .iter()
            .filter(|((t, _), s)| *t == tenant_id && s.document_id == document_id)
            .map(|((_, id), _)| *id)
            .collect();
        for share_id in &doomed {
            state.shares.remove(&(tenant_id, *share_id));
        }
        state
            .notifications
            .retain(|(t, _), n| !(*t == tenant_id && doomed.contains(&n.share_id)));
        doomed.len()
    }

    fn get_notification(&self, tenant_id: TenantId, id: &NotificationId) -> Option<ShareNotification> {
        let state = self.inner.read().ok()?;
        state.notifications.get(&(tenant_id, *id)).cloned()
    }

    fn notifications_for(&self, tenant_id: TenantId, recipient: UserId) -> Vec<ShareNotification> {
        let state = match self.inner.read() {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        let mut inbox: Vec<ShareNotification> = state
            .notifications
            .iter()
            .filter_map(|((t, _), n)| {
                if *t == tenant_id && n.recipient == recipient {
                    Some(n.clone())
                } else {
                    None
                }
            })
            .collect();
        inbox.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        inbox
    }

    fn update_notification(
        &self,
        tenant_id: TenantId,
        mut notification: ShareNotification,
    ) -> DomainResult<()> {
        let mut state = self.inner.write().map_err(|_| Self::lock_err())?;
        notification.assign_tenant(tenant_id);
        state
            .notifications
            .insert((tenant_id, notification.id), notification);
        Ok(())
    }

    fn mark_expired_due(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Vec<DocumentShare> {
        let mut state = match self.inner.write() {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        let mut transitioned = Vec::new();
        for ((t, _), share) in state.shares.iter_mut() {
            if *t == tenant_id && share.mark_expired(now) {
                transitioned.push(share.clone());
            }
        }
        transitioned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use docuvault_documents::{NotificationKind, SharePermissions, ShareStatus};

    fn pending_share(
        document_id: DocumentId,
        shared_by: UserId,
        shared_with: UserId,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> (DocumentShare, ShareNotification) {
        let share = DocumentShare::new(
            document_id,
            shared_by,
            shared_with,
            SharePermissions::default(),
            String::new(),
            expires_at,
            now,
        )
        .unwrap();
        let draft = share.created_notification();
        let notification =
            ShareNotification::new(draft.recipient, share.id, draft.kind, Some(shared_by), now);
        (share, notification)
    }

    #[test]
    fn create_writes_share_and_notification_together() {
        let ledger = InMemorySharingLedger::new();
        let tenant = TenantId::new();
        let now = Utc::now();
        let (share, notification) =
            pending_share(DocumentId::new(), UserId::new(), UserId::new(), None, now);
        let recipient = share.shared_with;

        let stored = ledger.create(tenant, share, notification, now).unwrap();
        assert_eq!(stored.tenant_id, tenant);
        assert_eq!(ledger.list_shares(tenant).len(), 1);

        let inbox = ledger.notifications_for(tenant, recipient);
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].tenant_id, tenant);
        assert_eq!(inbox[0].kind, NotificationKind::ShareReceived);
        assert_eq!(inbox[0].share_id, stored.id);
    }

    #[test]
    fn duplicate_share_conflicts_and_writes_nothing() {
        let ledger = InMemorySharingLedger::new();
        let tenant = TenantId::new();
        let now = Utc::now();
        let document = DocumentId::new();
        let sharer = UserId::new();
        let recipient = UserId::new();

        let (first, first_note) = pending_share(document, sharer, recipient, None, now);
        ledger.create(tenant, first, first_note, now).unwrap();

        let (dup, dup_note) = pending_share(document, sharer, recipient, None, now);
        let err = ledger.create(tenant, dup, dup_note, now).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // The failed insert must not have left its notification behind.
        assert_eq!(ledger.list_shares(tenant).len(), 1);
        assert_eq!(ledger.notifications_for(tenant, recipient).len(), 1);
    }

    #[test]
    fn revoked_share_still_blocks_resharing() {
        let ledger = InMemorySharingLedger::new();
        let tenant = TenantId::new();
        let now = Utc::now();
        let document = DocumentId::new();
        let sharer = UserId::new();
        let recipient = UserId::new();

        let (share, note) = pending_share(document, sharer, recipient, None, now);
        let mut stored = ledger.create(tenant, share, note, now).unwrap();

        let draft = stored.revoke(sharer, now).unwrap();
        let revoke_note =
            ShareNotification::new(draft.recipient, stored.id, draft.kind, Some(sharer), now);
        ledger.apply_transition(tenant, stored, revoke_note).unwrap();

        let (again, again_note) = pending_share(document, sharer, recipient, None, now);
        let err = ledger.create(tenant, again, again_note, now).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn expired_share_still_blocks_a_new_one() {
        let ledger = InMemorySharingLedger::new();
        let tenant = TenantId::new();
        let now = Utc::now();
        let document = DocumentId::new();
        let sharer = UserId::new();
        let recipient = UserId::new();

        let (share, note) =
            pending_share(document, sharer, recipient, Some(now + Duration::hours(1)), now);
        ledger.create(tenant, share, note, now).unwrap();

        let after_expiry = now + Duration::hours(2);
        let (again, again_note) = pending_share(document, sharer, recipient, None, after_expiry);
        let err = ledger
            .create(tenant, again, again_note, after_expiry)
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // Sharing the same document with someone else stays open.
        let (other, other_note) =
            pending_share(document, sharer, UserId::new(), None, after_expiry);
        assert!(ledger.create(tenant, other, other_note, after_expiry).is_ok());
    }

    #[test]
    fn transition_persists_share_and_notification() {
        let ledger = InMemorySharingLedger::new();
        let tenant = TenantId::new();
        let now = Utc::now();
        let sharer = UserId::new();

        let (share, note) = pending_share(DocumentId::new(), sharer, UserId::new(), None, now);
        let mut stored = ledger.create(tenant, share, note, now).unwrap();
        let recipient = stored.shared_with;

        let draft = stored.accept(recipient, now).unwrap();
        let accept_note =
            ShareNotification::new(draft.recipient, stored.id, draft.kind, Some(recipient), now);
        ledger
            .apply_transition(tenant, stored.clone(), accept_note)
            .unwrap();

        let reloaded = ledger.get_share(tenant, &stored.id).unwrap();
        assert_eq!(reloaded.status, ShareStatus::Accepted);
        let sharer_inbox = ledger.notifications_for(tenant, sharer);
        assert_eq!(sharer_inbox.len(), 1);
        assert_eq!(sharer_inbox[0].kind, NotificationKind::ShareAccepted);
    }

    #[test]
    fn destroying_a_document_drops_its_shares_and_notifications() {
        let ledger = InMemorySharingLedger::new();
        let tenant = TenantId::new();
        let now = Utc::now();
        let document = DocumentId::new();

        let (share, note) = pending_share(document, UserId::new(), UserId::new(), None, now);
        let recipient = share.shared_with;
        ledger.create(tenant, share, note, now).unwrap();

        let (other, other_note) =
            pending_share(DocumentId::new(), UserId::new(), UserId::new(), None, now);
        ledger.create(tenant, other, other_note, now).unwrap();

        assert_eq!(ledger.remove_shares_for_document(tenant, document), 1);
        assert_eq!(ledger.list_shares(tenant).len(), 1);
        assert!(ledger.notifications_for(tenant, recipient).is_empty());
    }

    #[test]
    fn mark_expired_due_flips_only_due_rows() {
        let ledger = InMemorySharingLedger::new();
        let tenant = TenantId::new();
        let now = Utc::now();

        let (due, due_note) = pending_share(
            DocumentId::new(),
            UserId::new(),
            UserId::new(),
            Some(now + Duration::hours(1)),
            now,
        );
        let due_id = ledger.create(tenant, due, due_note, now).unwrap().id;

        let (open, open_note) =
            pending_share(DocumentId::new(), UserId::new(), UserId::new(), None, now);
        let open_id = ledger.create(tenant, open, open_note, now).unwrap().id;

        let after_expiry = now + Duration::hours(2);
        let flipped = ledger.mark_expired_due(tenant, after_expiry);
        assert_eq!(flipped.len(), 1);
        assert_eq!(flipped[0].id, due_id);

        assert_eq!(
            ledger.get_share(tenant, &due_id).unwrap().status,
            ShareStatus::Expired
        );
        assert_eq!(
            ledger.get_share(tenant, &open_id).unwrap().status,
            ShareStatus::Pending
        );
        // Second sweep finds nothing left to do.
        assert!(ledger.mark_expired_due(tenant, after_expiry).is_empty());
    }

    #[test]
    fn ledger_reads_are_tenant_isolated() {
        let ledger = InMemorySharingLedger::new();
        let t1 = TenantId::new();
        let t2 = TenantId::new();
        let now = Utc::now();

        let (share, note) = pending_share(DocumentId::new(), UserId::new(), UserId::new(), None, now);
        let recipient = share.shared_with;
        let stored = ledger.create(t1, share, note, now).unwrap();

        assert!(ledger.list_shares(t2).is_empty());
        assert!(ledger.get_share(t2, &stored.id).is_none());
        assert!(ledger.notifications_for(t2, recipient).is_empty());
    }

    #[test]
    fn update_notification_persists_the_read_flag() {
        let ledger = InMemorySharingLedger::new();
        let tenant = TenantId::new();
        let now = Utc::now();

        let (share, note) = pending_share(DocumentId::new(), UserId::new(), UserId::new(), None, now);
        let recipient = share.shared_with;
        ledger.create(tenant, share, note, now).unwrap();

        let mut n = ledger.notifications_for(tenant, recipient).remove(0);
        n.mark_read(now);
        ledger.update_notification(tenant, n.clone()).unwrap();

        let reloaded = ledger.get_notification(tenant, &n.id).unwrap();
        assert!(reloaded.is_read);
        assert_eq!(reloaded.read_at, Some(now));
    }
}
