//! Logging configuration using tracing
//!
//! Structured logging to stderr, filtered through the RUST_LOG environment variable.

use crate::WardenError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber
///
/// Sets up structured logging with:
/// - Filtering via RUST_LOG (defaults to "warn")
/// - Compact formatted output to stderr with targets and thread IDs
///
/// # Example RUST_LOG values
/// - `RUST_LOG=info` - Show every reconciliation run
/// - `RUST_LOG=channelwarden::reconcile=debug` - Per-channel decisions
/// - `RUST_LOG=channelwarden=trace` - Everything, including lock traffic
///
/// # Errors
/// Returns an error if the subscriber has already been initialized
pub fn init() -> crate::Result<()> {
    init_with_default("warn")
}

/// Like [`init`], with `default_level` used when RUST_LOG is unset or invalid
pub fn init_with_default(default_level: &str) -> crate::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true).compact())
        .try_init()
        .map_err(|e| WardenError::Other(format!("Failed to initialize tracing: {}", e)))
}

/// Initialize logging for tests
///
/// Every test may call this; only the first call installs a subscriber.
pub fn init_test() {
    if let Err(e) = init_with_default("warn") {
        tracing::trace!(error = %e, "Tracing subscriber already installed");
    }
}
