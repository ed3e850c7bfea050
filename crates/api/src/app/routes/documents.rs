use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use docuvault_auth::Role;
use docuvault_core::{DocumentId, DomainError, TenantId};
use docuvault_documents::{
    access_allows, Document, DocumentShare, ShareCapability, ShareNotification, SharePermissions,
    ShareStatus, StorageRef,
};
use docuvault_infra::{archive_key_for, object_key, MAX_UPLOAD_BYTES};
use docuvault_tenancy::TenantContext;

use crate::app::dto;
use crate::app::errors::{domain_error_response, parse_id};
use crate::app::services::{AppServices, RealtimeMessage};
use crate::authz;
use crate::context::CurrentUser;

/// Presigned URLs are short-lived; clients re-request rather than hold them.
const TRANSFER_URL_TTL: Duration = Duration::from_secs(15 * 60);

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_documents).post(register_document))
        .route(
            "/:id",
            get(get_document).patch(update_document).delete(delete_document),
        )
        .route("/:id/archive", post(archive_document))
        .route("/:id/download", get(download_document))
        .route("/:id/share", post(share_document))
}

fn require_tenant() -> Result<TenantId, axum::response::Response> {
    TenantContext::require().map_err(domain_error_response)
}

/// Registers the document and mints the upload URL the client PUTs the
/// bytes against. The backend never sees the file itself.
pub async fn register_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<dto::RegisterDocumentRequest>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "documents", "create") {
        return domain_error_response(err);
    }
    let tenant = match require_tenant() {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };

    if body.file_size == 0 {
        return domain_error_response(DomainError::validation("file size must be greater than zero"));
    }
    if body.file_size > MAX_UPLOAD_BYTES {
        return domain_error_response(DomainError::validation(
            "file exceeds the 100 MiB upload limit",
        ));
    }
    if let Some(folder_id) = body.folder_id {
        if services.folders.get(&folder_id).is_none() {
            return domain_error_response(DomainError::NotFound);
        }
    }

    let now = Utc::now();
    let mime_type = body
        .mime_type
        .as_deref()
        .unwrap_or("application/octet-stream");
    let storage = StorageRef {
        bucket: services.bucket.clone(),
        key: String::new(),
        version: None,
    };
    let mut document = match Document::new(
        &body.filename,
        body.folder_id,
        mime_type,
        body.file_size,
        storage,
        Some(user.user_id()),
        now,
    ) {
        Ok(document) => document,
        Err(err) => return domain_error_response(err),
    };
    document.storage.key = object_key(tenant, document.id, &body.filename, now);
    if let Some(nickname) = body.nickname {
        document.set_nickname(Some(nickname), now);
    }
    if let Some(description) = body.description {
        document.set_description(description, now);
    }

    let upload = match services
        .objects
        .presign_upload(&document.storage.key, &document.mime_type, TRANSFER_URL_TTL)
        .await
    {
        Ok(upload) => upload,
        Err(err) => return domain_error_response(err),
    };

    match services.documents.insert(document.id, document) {
        Ok(document) => {
            tracing::info!(document = %document.id, size = document.file_size, "document registered");
            (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "document": dto::document_to_json(&document),
                    "upload": upload,
                })),
            )
                .into_response()
        }
        Err(err) => domain_error_response(err),
    }
}

/// A member sees what they created plus what is shared with them through
/// an accepted, unexpired share. Roles widen write access, never read
/// scope.
pub async fn list_documents(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<dto::DocumentQuery>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "documents", "list") {
        return domain_error_response(err);
    }
    let tenant = match require_tenant() {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };

    let now = Utc::now();
    let shared_with_me: Vec<DocumentId> = services
        .ledger
        .list_shares(tenant)
        .into_iter()
        .filter(|share| {
            share.shared_with == user.user_id() && share.effective_status(now) == ShareStatus::Accepted
        })
        .map(|share| share.document_id)
        .collect();

    let mut documents: Vec<Document> = services
        .documents
        .list()
        .into_iter()
        .filter(|d| d.created_by == Some(user.user_id()) || shared_with_me.contains(&d.id))
        .filter(|d| query.include_archived || !d.is_archived)
        .filter(|d| match query.folder_id {
            Some(folder_id) => d.folder_id == Some(folder_id),
            None => true,
        })
        .filter(|d| match query.file_type {
            Some(file_type) => d.file_type == file_type,
            None => true,
        })
        .filter(|d| match &query.q {
            Some(q) => d.matches_search(q, query.include_description),
            None => true,
        })
        .collect();
    documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let items = documents.iter().map(dto::document_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "documents", "retrieve") {
        return domain_error_response(err);
    }
    let document_id: DocumentId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.documents.require(&document_id) {
        Ok(document) => (StatusCode::OK, Json(dto::document_to_json(&document))).into_response(),
        Err(err) => domain_error_response(err),
    }
}

pub async fn update_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateDocumentRequest>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "documents", "partial_update") {
        return domain_error_response(err);
    }
    let document_id: DocumentId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let now = Utc::now();
    let mut document = match services.documents.require(&document_id) {
        Ok(document) => document,
        Err(err) => return domain_error_response(err),
    };

    if let Some(folder_id) = body.folder_id {
        if let Some(folder_id) = folder_id {
            if services.folders.get(&folder_id).is_none() {
                return domain_error_response(DomainError::NotFound);
            }
        }
        document.move_to(folder_id, now);
    }
    if let Some(nickname) = body.nickname {
        document.set_nickname(nickname, now);
    }
    if let Some(description) = body.description {
        document.set_description(description, now);
    }

    match services.documents.upsert(document.id, document) {
        Ok(document) => (StatusCode::OK, Json(dto::document_to_json(&document))).into_response(),
        Err(err) => domain_error_response(err),
    }
}

/// Moves the object under the archive prefix and flags the row. Archived
/// documents stay readable; they drop out of default listings.
pub async fn archive_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "documents", "archive") {
        return domain_error_response(err);
    }
    let document_id: DocumentId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut document = match services.documents.require(&document_id) {
        Ok(document) => document,
        Err(err) => return domain_error_response(err),
    };
    if document.is_archived {
        return domain_error_response(DomainError::conflict("document is already archived"));
    }

    let now = Utc::now();
    let archived_key = archive_key_for(&document.storage.key);
    if let Err(err) = services
        .objects
        .rename(&document.storage.key, &archived_key)
        .await
    {
        return domain_error_response(err);
    }
    document.archive(archived_key, now);

    match services.documents.upsert(document.id, document) {
        Ok(document) => {
            tracing::info!(document = %document.id, "document archived");
            (
                StatusCode::OK,
                Json(serde_json::json!({ "status": "archived", "document": dto::document_to_json(&document) })),
            )
                .into_response()
        }
        Err(err) => domain_error_response(err),
    }
}

/// Destroying a document also drops its shares, their notifications and
/// the stored object.
pub async fn delete_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "documents", "destroy") {
        return domain_error_response(err);
    }
    let tenant = match require_tenant() {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };
    let document_id: DocumentId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let document = match services.documents.remove(&document_id) {
        Ok(document) => document,
        Err(err) => return domain_error_response(err),
    };

    let removed_shares = services.ledger.remove_shares_for_document(tenant, document.id);
    if let Err(err) = services.objects.delete(&document.storage.key).await {
        return domain_error_response(err);
    }
    tracing::info!(document = %document.id, removed_shares, "document destroyed");
    StatusCode::NO_CONTENT.into_response()
}

pub async fn download_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "documents", "retrieve") {
        return domain_error_response(err);
    }
    let tenant = match require_tenant() {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };
    let document_id: DocumentId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let document = match services.documents.require(&document_id) {
        Ok(document) => document,
        Err(err) => return domain_error_response(err),
    };

    // Creator or an accepted, unexpired share carrying can_download.
    // Checked at read time, so an expired share denies even before the
    // sweep has caught up with it.
    let shares = services.ledger.shares_for_document(tenant, document.id);
    if !access_allows(
        &document,
        &shares,
        user.user_id(),
        ShareCapability::Download,
        Utc::now(),
    ) {
        return domain_error_response(DomainError::forbidden(
            "you do not have download access to this document",
        ));
    }

    match services
        .objects
        .presign_download(&document.storage.key, TRANSFER_URL_TTL)
        .await
    {
        Ok(download) => (StatusCode::OK, Json(serde_json::json!({ "download": download }))).into_response(),
        Err(err) => domain_error_response(err),
    }
}

/// Creates one pending share per recipient, each with its `share_received`
/// notification written in the same ledger unit and pushed to the
/// recipient's event stream.
pub async fn share_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<dto::ShareDocumentRequest>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "shares", "create") {
        return domain_error_response(err);
    }
    let tenant = match require_tenant() {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };
    let document_id: DocumentId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    if body.user_ids.is_empty() {
        return domain_error_response(DomainError::validation("at least one recipient is required"));
    }

    let document = match services.documents.require(&document_id) {
        Ok(document) => document,
        Err(err) => return domain_error_response(err),
    };

    // Creator or can_share grant; account admins may share any document in
    // the account.
    let now = Utc::now();
    let shares = services.ledger.shares_for_document(tenant, document.id);
    let is_admin = user
        .membership()
        .map(|m| m.role == Role::Admin)
        .unwrap_or(false);
    if !is_admin
        && !access_allows(&document, &shares, user.user_id(), ShareCapability::Share, now)
    {
        return domain_error_response(DomainError::forbidden(
            "you do not have share access to this document",
        ));
    }

    let permissions = SharePermissions {
        can_download: body.can_download,
        can_share: body.can_share,
        can_edit: body.can_edit,
    };

    let mut created = Vec::with_capacity(body.user_ids.len());
    for recipient in body.user_ids {
        let share = match DocumentShare::new(
            document.id,
            user.user_id(),
            recipient,
            permissions,
            body.message.clone(),
            body.expires_at,
            now,
        ) {
            Ok(share) => share,
            Err(err) => return domain_error_response(err),
        };
        let draft = share.created_notification();
        let notification =
            ShareNotification::new(draft.recipient, share.id, draft.kind, Some(user.user_id()), now);

        let share = match services.ledger.create(tenant, share, notification.clone(), now) {
            Ok(share) => share,
            Err(err) => return domain_error_response(err),
        };

        services.publish(RealtimeMessage {
            tenant_id: tenant,
            recipient: notification.recipient,
            topic: notification.kind.as_str().to_string(),
            payload: dto::notification_to_json(&notification),
        });
        tracing::info!(document = %document.id, share = %share.id, recipient = %recipient, "document shared");
        created.push(dto::share_to_json(&share, now));
    }

    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "shares": created })),
    )
        .into_response()
}
