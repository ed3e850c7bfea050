use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docuvault_core::{DomainError, DomainResult, FolderId, TenantId, TenantScoped, UserId};

/// A folder in the per-tenant hierarchy.
///
/// `parent_id == None` means the folder sits at the root. Names are unique
/// among siblings within one tenant; the store layer enforces that at
/// insert/rename time because it can see the siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub tenant_id: TenantId,
    pub name: String,
    pub parent_id: Option<FolderId>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    pub fn new(
        name: &str,
        parent_id: Option<FolderId>,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = valid_name(name)?;
        Ok(Self {
            id: FolderId::new(),
            // Stamped by the scoped store on insert.
            tenant_id: TenantId::nil(),
            name,
            parent_id,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rename(&mut self, name: &str, now: DateTime<Utc>) -> DomainResult<()> {
        self.name = valid_name(name)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn set_parent(&mut self, parent_id: Option<FolderId>, now: DateTime<Utc>) {
        self.parent_id = parent_id;
        self.updated_at = now;
    }
}

impl TenantScoped for Folder {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = tenant_id;
    }
}

/// Folder names join into `/`-separated paths, so the separator is the one
/// character a name may not contain.
fn valid_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("folder name cannot be empty"));
    }
    if name.len() > 255 {
        return Err(DomainError::validation("folder name too long"));
    }
    if name.contains('/') {
        return Err(DomainError::validation("folder name cannot contain '/'"));
    }
    Ok(name.to_string())
}

/// Render the path from the root to `target`, `/`-joined.
///
/// `folders` is the tenant's folder list; unknown parents terminate the
/// walk (the partial path is still returned). The step bound keeps a
/// corrupted parent chain from looping forever.
pub fn full_path(target: &Folder, folders: &[Folder]) -> String {
    let mut segments = vec![target.name.as_str()];
    let mut current = target.parent_id;
    let mut steps = 0;
    while let Some(parent_id) = current {
        if steps > folders.len() {
            break;
        }
        steps += 1;
        match folders.iter().find(|f| f.id == parent_id) {
            Some(parent) => {
                segments.push(parent.name.as_str());
                current = parent.parent_id;
            }
            None => break,
        }
    }
    segments.reverse();
    segments.join("/")
}

/// Would re-parenting `folder` under `new_parent` create a cycle?
///
/// True when the new parent is the folder itself or any of its descendants.
pub fn would_create_cycle(folders: &[Folder], folder: FolderId, new_parent: FolderId) -> bool {
    if folder == new_parent {
        return true;
    }
    // Walk upward from the candidate parent; hitting `folder` means the
    // candidate lives in its subtree.
    let mut current = Some(new_parent);
    let mut steps = 0;
    while let Some(id) = current {
        if id == folder {
            return true;
        }
        if steps > folders.len() {
            return false;
        }
        steps += 1;
        current = folders.iter().find(|f| f.id == id).and_then(|f| f.parent_id);
    }
    false
}
