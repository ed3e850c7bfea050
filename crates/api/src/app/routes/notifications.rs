use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use docuvault_core::{DomainError, NotificationId};
use docuvault_tenancy::TenantContext;

use crate::app::dto;
use crate::app::errors::{domain_error_response, parse_id};
use crate::app::services::{self, AppServices};
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/:id/read", post(mark_read))
        .route("/read-all", post(mark_all_read))
        .route("/stream", get(stream))
}

pub async fn list_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "notifications", "list") {
        return domain_error_response(err);
    }
    let tenant = match TenantContext::require() {
        Ok(tenant) => tenant,
        Err(err) => return domain_error_response(err),
    };

    let items = services
        .ledger
        .notifications_for(tenant, user.user_id())
        .iter()
        .map(dto::notification_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn unread_count(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "notifications", "list") {
        return domain_error_response(err);
    }
    let tenant = match TenantContext::require() {
        Ok(tenant) => tenant,
        Err(err) => return domain_error_response(err),
    };

    let unread = services
        .ledger
        .notifications_for(tenant, user.user_id())
        .iter()
        .filter(|n| !n.is_read)
        .count();
    (StatusCode::OK, Json(serde_json::json!({ "unread": unread }))).into_response()
}

pub async fn mark_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "notifications", "update") {
        return domain_error_response(err);
    }
    let tenant = match TenantContext::require() {
        Ok(tenant) => tenant,
        Err(err) => return domain_error_response(err),
    };
    let notification_id: NotificationId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut notification = match services.ledger.get_notification(tenant, &notification_id) {
        Some(notification) => notification,
        None => return domain_error_response(DomainError::NotFound),
    };
    // Someone else's notification reads as absent, same as a foreign
    // tenant's row.
    if notification.recipient != user.user_id() {
        return domain_error_response(DomainError::NotFound);
    }

    notification.mark_read(Utc::now());
    match services.ledger.update_notification(tenant, notification.clone()) {
        Ok(()) => (StatusCode::OK, Json(dto::notification_to_json(&notification))).into_response(),
        Err(err) => domain_error_response(err),
    }
}

pub async fn mark_all_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "notifications", "update") {
        return domain_error_response(err);
    }
    let tenant = match TenantContext::require() {
        Ok(tenant) => tenant,
        Err(err) => return domain_error_response(err),
    };

    let now = Utc::now();
    let mut marked = 0usize;
    for mut notification in services.ledger.notifications_for(tenant, user.user_id()) {
        if notification.is_read {
            continue;
        }
        notification.mark_read(now);
        if services.ledger.update_notification(tenant, notification).is_ok() {
            marked += 1;
        }
    }
    (StatusCode::OK, Json(serde_json::json!({ "marked": marked }))).into_response()
}

pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "notifications", "list") {
        return domain_error_response(err);
    }
    let tenant = match TenantContext::require() {
        Ok(tenant) => tenant,
        Err(err) => return domain_error_response(err),
    };

    services::notification_sse_stream(services, tenant, user.user_id()).into_response()
}
