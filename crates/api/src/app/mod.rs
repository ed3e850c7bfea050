//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backing stores, sharing ledger, object store, realtime fanout
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request payloads and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router with freshly wired services.
pub async fn build_app(jwt_secret: String) -> Router {
    let services = Arc::new(services::build_services().await);
    build_app_with_services(jwt_secret, services)
}

/// Router over existing services. `main` uses this so the expiry sweep can
/// share the same directory and ledger the handlers write through.
pub fn build_app_with_services(jwt_secret: String, services: Arc<AppServices>) -> Router {
    let jwt = Arc::new(docuvault_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState {
        jwt,
        services: services.clone(),
    };

    // The platform gate sits inside the auth middleware: the token is
    // validated first, then the admin surface checks the platform flag.
    let admin = Router::new()
        .nest("/admin", routes::accounts::router())
        .route_layer(axum::middleware::from_fn(middleware::require_platform));

    let protected = routes::router()
        .merge(admin)
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
