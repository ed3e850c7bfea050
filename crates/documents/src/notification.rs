use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docuvault_core::{NotificationId, ShareId, TenantId, TenantScoped, UserId};

/// What happened to the share this notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ShareReceived,
    ShareAccepted,
    ShareRejected,
    ShareRevoked,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ShareReceived => "share_received",
            NotificationKind::ShareAccepted => "share_accepted",
            NotificationKind::ShareRejected => "share_rejected",
            NotificationKind::ShareRevoked => "share_revoked",
        }
    }
}

impl core::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user inbox entry produced alongside a share transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareNotification {
    pub id: NotificationId,
    pub tenant_id: TenantId,
    pub recipient: UserId,
    pub share_id: ShareId,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl ShareNotification {
    pub fn new(
        recipient: UserId,
        share_id: ShareId,
        kind: NotificationKind,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            // Stamped by the scoped store on insert.
            tenant_id: TenantId::nil(),
            recipient,
            share_id,
            kind,
            is_read: false,
            read_at: None,
            created_by,
            created_at: now,
        }
    }

    /// Idempotent: re-reading keeps the first `read_at`.
    pub fn mark_read(&mut self, now: DateTime<Utc>) {
        if !self.is_read {
            self.is_read = true;
            self.read_at = Some(now);
        }
    }
}

impl TenantScoped for ShareNotification {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = tenant_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn starts_unread() {
        let n = ShareNotification::new(
            UserId::new(),
            ShareId::new(),
            NotificationKind::ShareReceived,
            None,
            Utc::now(),
        );
        assert!(!n.is_read);
        assert_eq!(n.read_at, None);
    }

    #[test]
    fn mark_read_keeps_the_first_timestamp() {
        let now = Utc::now();
        let mut n = ShareNotification::new(
            UserId::new(),
            ShareId::new(),
            NotificationKind::ShareAccepted,
            None,
            now,
        );

        n.mark_read(now);
        assert!(n.is_read);
        assert_eq!(n.read_at, Some(now));

        n.mark_read(now + Duration::minutes(5));
        assert_eq!(n.read_at, Some(now));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&NotificationKind::ShareRevoked).unwrap();
        assert_eq!(json, "\"share_revoked\"");
        assert_eq!(NotificationKind::ShareRevoked.as_str(), "share_revoked");
    }
}
