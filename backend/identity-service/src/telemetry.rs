//! Structured logging setup

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "ridehail_identity=info,info";

/// Install a JSON `tracing` subscriber filtered by `RUST_LOG`
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(service_name: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .json()
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(service = service_name, "Tracing initialized");
    }
    installed
}
