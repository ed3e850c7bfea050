use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::context::CurrentUser;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(user): Extension<CurrentUser>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": user.user_id(),
        "platform": user.is_platform_operator(),
        "account_id": user.tenant_id(),
        "role": user.membership().map(|m| m.role),
    }))
}
