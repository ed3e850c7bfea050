//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber: JSON lines, `RUST_LOG`-style
/// filtering, info by default.
///
/// Uses `try_init` so repeated calls (tests, embedded use) are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
