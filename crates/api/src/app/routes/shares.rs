use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};

use docuvault_core::{DomainResult, ShareId, UserId};
use docuvault_documents::{DocumentShare, NotificationDraft, ShareNotification};
use docuvault_tenancy::TenantContext;

use crate::app::dto;
use crate::app::errors::{domain_error_response, parse_id};
use crate::app::services::{AppServices, RealtimeMessage};
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/sent", get(list_sent))
        .route("/received", get(list_received))
        .route("/:id/accept", post(accept_share))
        .route("/:id/reject", post(reject_share))
        .route("/:id/revoke", post(revoke_share))
}

async fn list_shares_where(
    services: Arc<AppServices>,
    user: CurrentUser,
    filter: impl Fn(&DocumentShare, UserId) -> bool,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "shares", "list") {
        return domain_error_response(err);
    }
    let tenant = match TenantContext::require() {
        Ok(tenant) => tenant,
        Err(err) => return domain_error_response(err),
    };

    let now = Utc::now();
    let items = services
        .ledger
        .list_shares(tenant)
        .into_iter()
        .filter(|share| filter(share, user.user_id()))
        .map(|share| dto::share_to_json(&share, now))
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn list_sent(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    list_shares_where(services, user, |share, me| share.shared_by == me).await
}

pub async fn list_received(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    list_shares_where(services, user, |share, me| share.shared_with == me).await
}

/// Applies one lifecycle transition and persists the share together with
/// the notification the transition produced. The domain methods enforce
/// actor and state legality; this layer only moves data.
async fn transition_share(
    services: Arc<AppServices>,
    user: CurrentUser,
    raw_id: String,
    action: &str,
    apply: impl FnOnce(&mut DocumentShare, UserId, DateTime<Utc>) -> DomainResult<NotificationDraft>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "shares", action) {
        return domain_error_response(err);
    }
    let tenant = match TenantContext::require() {
        Ok(tenant) => tenant,
        Err(err) => return domain_error_response(err),
    };
    let share_id: ShareId = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut share = match services.ledger.get_share(tenant, &share_id) {
        Some(share) => share,
        None => return domain_error_response(docuvault_core::DomainError::NotFound),
    };

    let now = Utc::now();
    let draft = match apply(&mut share, user.user_id(), now) {
        Ok(draft) => draft,
        Err(err) => return domain_error_response(err),
    };
    let notification =
        ShareNotification::new(draft.recipient, share.id, draft.kind, Some(user.user_id()), now);

    if let Err(err) = services
        .ledger
        .apply_transition(tenant, share.clone(), notification.clone())
    {
        return domain_error_response(err);
    }

    services.publish(RealtimeMessage {
        tenant_id: tenant,
        recipient: notification.recipient,
        topic: notification.kind.as_str().to_string(),
        payload: dto::notification_to_json(&notification),
    });
    tracing::info!(share = %share.id, status = ?share.status, "share transitioned");

    (StatusCode::OK, Json(dto::share_to_json(&share, now))).into_response()
}

pub async fn accept_share(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition_share(services, user, id, "accept", |share, actor, now| {
        share.accept(actor, now)
    })
    .await
}

pub async fn reject_share(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition_share(services, user, id, "reject", |share, actor, now| {
        share.reject(actor, now)
    })
    .await
}

pub async fn revoke_share(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition_share(services, user, id, "revoke", |share, actor, now| {
        share.revoke(actor, now)
    })
    .await
}
