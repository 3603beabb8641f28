//! Structured logging

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Install the JSON subscriber, filtered by `service.log_level`
///
/// `RUST_LOG` is not consulted; the level comes from configuration (which
/// `RENTAL_SERVICE__LOG_LEVEL` can override). Calling this twice is harmless:
/// the second install attempt is ignored.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|e| {
        eprintln!(
            "invalid log_level '{}': {e}; falling back to info",
            config.service.log_level
        );
        EnvFilter::new("info")
    });

    let installed = tracing_subscriber::fmt()
        .json()
        .with_current_span(true)
        .with_env_filter(filter)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            service = %config.service.name,
            environment = %config.service.environment,
            "Tracing initialized"
        );
    }
}
