use std::sync::Arc;

use docuvault_infra::{ShareExpirySweep, ShareExpirySweepConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    docuvault_observability::init();

    let jwt_secret = std::env::var("DOCUVAULT_JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("DOCUVAULT_JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });
    let addr = std::env::var("DOCUVAULT_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let services = Arc::new(docuvault_api::app::services::build_services().await);

    // The sweep shares the handlers' directory and ledger so expiry writes
    // land in the same stores the API reads.
    let sweep = ShareExpirySweep::new(services.directory.clone(), services.ledger.clone());
    let _sweep_handle = sweep.spawn(ShareExpirySweepConfig::default());

    let app = docuvault_api::app::build_app_with_services(jwt_secret, services);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
