use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docuvault_core::{FolderId, TenantId, TenantScoped, UserId};

/// Per-user UI state for a folder. Expansion is personal, not shared, so it
/// lives next to the folder rather than on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderUserState {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub folder_id: FolderId,
    pub is_expanded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FolderUserState {
    pub fn new(user_id: UserId, folder_id: FolderId, is_expanded: bool, now: DateTime<Utc>) -> Self {
        Self {
            // Stamped by the scoped store on insert.
            tenant_id: TenantId::nil(),
            user_id,
            folder_id,
            is_expanded,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_expanded(&mut self, is_expanded: bool, now: DateTime<Utc>) {
        self.is_expanded = is_expanded;
        self.updated_at = now;
    }
}

impl TenantScoped for FolderUserState {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = tenant_id;
    }
}
