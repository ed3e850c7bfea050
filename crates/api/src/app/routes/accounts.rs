//! Platform-operator administration: accounts and the profiles that bind
//! users into them. Runs behind `require_platform`; none of these touch the
//! tenant context.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use docuvault_core::{ProfileId, TenantId};

use crate::app::errors::{domain_error_response, parse_id};
use crate::app::services::AppServices;
use crate::app::dto;

pub fn router() -> Router {
    Router::new()
        .route("/accounts", post(create_account).get(list_accounts))
        .route("/accounts/:id/profiles", post(create_profile))
        .route("/profiles/:id/deactivate", post(deactivate_profile))
}

pub async fn create_account(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateAccountRequest>,
) -> axum::response::Response {
    match services.directory.create_account(&body.name, &body.slug, Utc::now()) {
        Ok(account) => (StatusCode::CREATED, Json(dto::account_to_json(&account))).into_response(),
        Err(err) => domain_error_response(err),
    }
}

pub async fn list_accounts(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let items = services
        .directory
        .list_accounts()
        .iter()
        .map(dto::account_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn create_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::CreateProfileRequest>,
) -> axum::response::Response {
    let account_id: TenantId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services
        .directory
        .create_profile(body.user_id, account_id, body.role, Utc::now())
    {
        Ok(profile) => (StatusCode::CREATED, Json(dto::profile_to_json(&profile))).into_response(),
        Err(err) => domain_error_response(err),
    }
}

pub async fn deactivate_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let profile_id: ProfileId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.directory.deactivate_profile(profile_id, Utc::now()) {
        Ok(profile) => (StatusCode::OK, Json(dto::profile_to_json(&profile))).into_response(),
        Err(err) => domain_error_response(err),
    }
}
