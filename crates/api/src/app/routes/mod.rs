use axum::{routing::get, Router};

pub mod accounts;
pub mod documents;
pub mod folders;
pub mod notifications;
pub mod shares;
pub mod system;

/// Router for all authenticated (tenant-scoped) endpoints. The `/admin`
/// surface is nested separately in `app::build_app_with_services` behind
/// the platform gate.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/folders", folders::router())
        .nest("/documents", documents::router())
        .nest("/shares", shares::router())
        .nest("/notifications", notifications::router())
}
