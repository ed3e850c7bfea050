//! `docuvault-documents` — document management domain rules.
//!
//! Folders, documents, shares and their notifications, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod document;
pub mod folder;
pub mod folder_state;
pub mod notification;
pub mod share;

pub use document::{Document, FileType, StorageRef};
pub use folder::Folder;
pub use folder_state::FolderUserState;
pub use notification::{NotificationKind, ShareNotification};
pub use share::{
    access_allows, DocumentShare, NotificationDraft, ShareCapability, SharePermissions,
    ShareStatus,
};
