use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use docuvault_auth::JwtValidator;
use docuvault_tenancy::TenantContext;

use crate::app::errors::json_error;
use crate::app::services::AppServices;
use crate::context::CurrentUser;

/// State handed to the auth middleware: the token validator plus the
/// services it resolves memberships against.
#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub services: Arc<AppServices>,
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Validates the bearer token, resolves the caller's account membership and
/// runs the rest of the request inside a tenant context bound to that
/// account. No membership means no context; tenant-scoped stores then fail
/// closed instead of seeing some default tenant.
pub async fn auth_middleware(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let token = match extract_bearer(req.headers()) {
        Some(token) => token,
        None => {
            return json_error(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "missing bearer token",
            );
        }
    };

    let claims = match state.jwt.validate(token, Utc::now()) {
        Ok(claims) => claims,
        Err(err) => {
            return json_error(StatusCode::UNAUTHORIZED, "unauthenticated", err.to_string());
        }
    };

    let membership = state
        .services
        .directory
        .resolve_membership(claims.sub)
        .map(|(_, membership)| membership);
    let user = CurrentUser::new(claims.sub, claims.platform, membership);
    let tenant_id = user.tenant_id();
    req.extensions_mut().insert(user);

    TenantContext::scope(tenant_id, next.run(req)).await
}

/// Gate for the `/admin` surface. The platform flag comes from the token;
/// in-tenant roles never grant it.
pub async fn require_platform(req: Request, next: Next) -> Response {
    let is_platform = req
        .extensions()
        .get::<CurrentUser>()
        .map(|user| user.is_platform_operator())
        .unwrap_or(false);

    if !is_platform {
        return json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "platform operator access required",
        );
    }

    next.run(req).await
}
