use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docuvault_core::{DocumentId, DomainError, DomainResult, ShareId, TenantId, TenantScoped, UserId};

use crate::document::Document;
use crate::notification::NotificationKind;

/// Lifecycle state of a share.
///
/// `Rejected`, `Revoked` and `Expired` are terminal. A stored `Pending` or
/// `Accepted` row whose expiry has passed is *logically* expired before the
/// sweep rewrites it; use [`DocumentShare::effective_status`] on every read
/// path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    Pending,
    Accepted,
    Rejected,
    Revoked,
    Expired,
}

impl ShareStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareStatus::Pending => "pending",
            ShareStatus::Accepted => "accepted",
            ShareStatus::Rejected => "rejected",
            ShareStatus::Revoked => "revoked",
            ShareStatus::Expired => "expired",
        }
    }
}

impl core::fmt::Display for ShareStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Independent capability flags granted by a share. None of them is
/// implied by the share's state; an accepted share with all three false
/// grants nothing but visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePermissions {
    pub can_download: bool,
    pub can_share: bool,
    pub can_edit: bool,
}

impl Default for SharePermissions {
    fn default() -> Self {
        Self {
            can_download: true,
            can_share: false,
            can_edit: false,
        }
    }
}

/// The capability a document-access decision is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareCapability {
    Download,
    Share,
    Edit,
}

/// Notification the caller must append in the same transaction as the
/// share mutation that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationDraft {
    pub recipient: UserId,
    pub kind: NotificationKind,
}

/// A directed share of one document from `shared_by` to `shared_with`.
///
/// At most one row exists per (document, shared_with); the store enforces
/// that uniqueness where it can see sibling rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentShare {
    pub id: ShareId,
    pub tenant_id: TenantId,
    pub document_id: DocumentId,
    pub shared_by: UserId,
    pub shared_with: UserId,
    pub status: ShareStatus,
    pub permissions: SharePermissions,
    pub message: String,
    pub shared_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentShare {
    pub fn new(
        document_id: DocumentId,
        shared_by: UserId,
        shared_with: UserId,
        permissions: SharePermissions,
        message: String,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if shared_by == shared_with {
            return Err(DomainError::validation(
                "cannot share a document with yourself",
            ));
        }
        if let Some(expiry) = expires_at {
            if expiry <= now {
                return Err(DomainError::validation("share expiry must be in the future"));
            }
        }

        Ok(Self {
            id: ShareId::new(),
            // Stamped by the scoped store on insert.
            tenant_id: TenantId::nil(),
            document_id,
            shared_by,
            shared_with,
            status: ShareStatus::Pending,
            permissions,
            message,
            shared_at: now,
            responded_at: None,
            expires_at,
            created_by: Some(shared_by),
            created_at: now,
            updated_at: now,
        })
    }

    /// On creation the recipient is told a share is waiting for them.
    pub fn created_notification(&self) -> NotificationDraft {
        NotificationDraft {
            recipient: self.shared_with,
            kind: NotificationKind::ShareReceived,
        }
    }

    /// Accept a pending share. Recipient only.
    pub fn accept(&mut self, actor: UserId, now: DateTime<Utc>) -> DomainResult<NotificationDraft> {
        self.ensure_recipient(actor, "accept")?;
        self.ensure_transition_from_pending("accepted", now)?;
        self.status = ShareStatus::Accepted;
        self.responded_at = Some(now);
        self.updated_at = now;
        Ok(NotificationDraft {
            recipient: self.shared_by,
            kind: NotificationKind::ShareAccepted,
        })
    }

    /// Reject a pending share. Recipient only.
    pub fn reject(&mut self, actor: UserId, now: DateTime<Utc>) -> DomainResult<NotificationDraft> {
        self.ensure_recipient(actor, "reject")?;
        self.ensure_transition_from_pending("rejected", now)?;
        self.status = ShareStatus::Rejected;
        self.responded_at = Some(now);
        self.updated_at = now;
        Ok(NotificationDraft {
            recipient: self.shared_by,
            kind: NotificationKind::ShareRejected,
        })
    }

    /// Revoke a pending or accepted share. Sharer only; revoking a share
    /// that is already terminal is an error, not a no-op.
    pub fn revoke(&mut self, actor: UserId, now: DateTime<Utc>) -> DomainResult<NotificationDraft> {
        if actor != self.shared_by {
            return Err(DomainError::forbidden("only the sharer can revoke a share"));
        }
        match self.effective_status(now) {
            ShareStatus::Pending | ShareStatus::Accepted => {}
            ShareStatus::Revoked => {
                return Err(DomainError::invalid_transition("share is already revoked"));
            }
            ShareStatus::Rejected => {
                return Err(DomainError::invalid_transition(
                    "cannot revoke a rejected share",
                ));
            }
            ShareStatus::Expired => {
                return Err(DomainError::invalid_transition("share has expired"));
            }
        }
        self.status = ShareStatus::Revoked;
        self.updated_at = now;
        Ok(NotificationDraft {
            recipient: self.shared_with,
            kind: NotificationKind::ShareRevoked,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|expiry| now > expiry).unwrap_or(false)
    }

    /// The stored status with read-time expiry applied. A row the sweep has
    /// not visited yet still reads as expired here.
    pub fn effective_status(&self, now: DateTime<Utc>) -> ShareStatus {
        match self.status {
            ShareStatus::Pending | ShareStatus::Accepted if self.is_expired(now) => {
                ShareStatus::Expired
            }
            status => status,
        }
    }

    /// Sweep helper: persist the `Expired` status for a due row. Returns
    /// whether anything changed.
    pub fn mark_expired(&mut self, now: DateTime<Utc>) -> bool {
        if self.effective_status(now) == ShareStatus::Expired && self.status != ShareStatus::Expired
        {
            self.status = ShareStatus::Expired;
            self.updated_at = now;
            true
        } else {
            false
        }
    }

    /// Does this share give `user` the asked-for capability right now?
    pub fn grants(&self, user: UserId, capability: ShareCapability, now: DateTime<Utc>) -> bool {
        if self.shared_with != user {
            return false;
        }
        if self.effective_status(now) != ShareStatus::Accepted {
            return false;
        }
        match capability {
            ShareCapability::Download => self.permissions.can_download,
            ShareCapability::Share => self.permissions.can_share,
            ShareCapability::Edit => self.permissions.can_edit,
        }
    }

    fn ensure_recipient(&self, actor: UserId, verb: &str) -> DomainResult<()> {
        if actor != self.shared_with {
            return Err(DomainError::forbidden(format!(
                "only the invited user can {verb} a share"
            )));
        }
        Ok(())
    }

    fn ensure_transition_from_pending(&self, target: &str, now: DateTime<Utc>) -> DomainResult<()> {
        match self.effective_status(now) {
            ShareStatus::Pending => Ok(()),
            ShareStatus::Expired => Err(DomainError::invalid_transition("share has expired")),
            status => Err(DomainError::invalid_transition(format!(
                "only pending shares can be {target}; this one is {status}"
            ))),
        }
    }
}

impl TenantScoped for DocumentShare {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = tenant_id;
    }
}

/// Document-access decision used by download/share/edit paths.
///
/// Grants when the requester created the document, or when an accepted,
/// unexpired share to them carries the asked-for flag.
pub fn access_allows(
    document: &Document,
    shares: &[DocumentShare],
    user: UserId,
    capability: ShareCapability,
    now: DateTime<Utc>,
) -> bool {
    if document.created_by == Some(user) {
        return true;
    }
    shares
        .iter()
        .filter(|s| s.document_id == document.id)
        .any(|s| s.grants(user, capability, now))
}
