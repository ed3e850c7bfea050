//! Process-wide tracing setup, shared by the server binary and tests.

/// Initialize logging for the process.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filter, format).
pub mod tracing;
