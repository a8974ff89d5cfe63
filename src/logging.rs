//! Tracing subscriber setup for binaries and tests embedding the search.

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a fmt subscriber filtered by `RUST_LOG`, or by `default_directive`
/// when the variable is unset. Returns `false` if a subscriber was already set.
pub fn init(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
