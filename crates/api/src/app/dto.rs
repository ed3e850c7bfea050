//! Request payloads and response JSON shapes.
//!
//! Responses are plain `serde_json::Value` maps built by the `*_to_json`
//! helpers so route modules stay free of bespoke response structs.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use docuvault_auth::Role;
use docuvault_core::{FolderId, UserId};
use docuvault_documents::{Document, DocumentShare, FileType, Folder, ShareNotification};
use docuvault_tenancy::{Account, UserProfile};

/// Distinguishes an absent PATCH field from an explicit `null`: `None`
/// leaves the value alone, `Some(None)` clears it.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

fn default_true() -> bool {
    true
}

/// Query-string fields arrive as text; `?parent_id=` means "unset", not a
/// malformed id.
fn empty_string_as_none<'de, T, D>(de: D) -> Result<Option<T>, D::Error>
where
    T: FromStr,
    T::Err: core::fmt::Display,
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(de)?;
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub user_id: UserId,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<FolderId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFolderRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<FolderId>>,
}

#[derive(Debug, Deserialize)]
pub struct FolderStateRequest {
    pub is_expanded: bool,
}

#[derive(Debug, Deserialize)]
pub struct FolderQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub parent_id: Option<FolderId>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterDocumentRequest {
    pub filename: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub file_size: u64,
    #[serde(default)]
    pub folder_id: Option<FolderId>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDocumentRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub nickname: Option<Option<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub folder_id: Option<Option<FolderId>>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub include_description: bool,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub folder_id: Option<FolderId>,
    #[serde(default)]
    pub file_type: Option<FileType>,
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Deserialize)]
pub struct ShareDocumentRequest {
    pub user_ids: Vec<UserId>,
    #[serde(default = "default_true")]
    pub can_download: bool,
    #[serde(default)]
    pub can_share: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

pub fn account_to_json(account: &Account) -> Value {
    json!({
        "id": account.id,
        "name": account.name,
        "slug": account.slug,
        "is_active": account.is_active,
        "created_at": account.created_at,
    })
}

pub fn profile_to_json(profile: &UserProfile) -> Value {
    json!({
        "id": profile.id,
        "user_id": profile.user_id,
        "account_id": profile.account_id,
        "role": profile.role,
        "is_active": profile.is_active,
        "created_at": profile.created_at,
    })
}

pub fn folder_to_json(folder: &Folder, full_path: &str, document_count: usize, is_expanded: bool) -> Value {
    json!({
        "id": folder.id,
        "name": folder.name,
        "parent_id": folder.parent_id,
        "full_path": full_path,
        "document_count": document_count,
        "is_expanded": is_expanded,
        "created_at": folder.created_at,
        "updated_at": folder.updated_at,
    })
}

pub fn document_to_json(document: &Document) -> Value {
    json!({
        "id": document.id,
        "name": document.display_name(),
        "original_name": document.original_name,
        "nickname": document.nickname,
        "description": document.description,
        "folder_id": document.folder_id,
        "file_type": document.file_type,
        "mime_type": document.mime_type,
        "file_size": document.file_size,
        "file_extension": document.file_extension,
        "is_archived": document.is_archived,
        "archived_at": document.archived_at,
        "created_by": document.created_by,
        "created_at": document.created_at,
        "updated_at": document.updated_at,
    })
}

/// The reported status is the effective one: a stored `pending` or
/// `accepted` past its expiry reads as `expired` regardless of sweep
/// timing.
pub fn share_to_json(share: &DocumentShare, now: DateTime<Utc>) -> Value {
    json!({
        "id": share.id,
        "document_id": share.document_id,
        "shared_by": share.shared_by,
        "shared_with": share.shared_with,
        "status": share.effective_status(now),
        "can_download": share.permissions.can_download,
        "can_share": share.permissions.can_share,
        "can_edit": share.permissions.can_edit,
        "message": share.message,
        "shared_at": share.shared_at,
        "responded_at": share.responded_at,
        "expires_at": share.expires_at,
    })
}

pub fn notification_to_json(notification: &ShareNotification) -> Value {
    json!({
        "id": notification.id,
        "recipient": notification.recipient,
        "share_id": notification.share_id,
        "kind": notification.kind,
        "is_read": notification.is_read,
        "read_at": notification.read_at,
        "created_at": notification.created_at,
    })
}
