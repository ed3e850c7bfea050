use core::str::FromStr;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use docuvault_core::DomainError;

pub fn domain_error_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    let (status, code) = match err {
        DomainError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
        DomainError::NoTenantContext => (StatusCode::FORBIDDEN, "no_tenant_context"),
        DomainError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
        DomainError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        DomainError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        DomainError::InvalidStateTransition(_) => (StatusCode::CONFLICT, "invalid_state_transition"),
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        DomainError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
    };
    json_error(status, code, message)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Path segments arrive as strings; id parsing failures map to the same
/// response shape as every other domain error.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(domain_error_response)
}
