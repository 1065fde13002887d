//! # Logging
//!
//! `tracing-subscriber` setup shared by the CLI and by test suites.

use crate::config::ReadinessConfig;
use crate::constants::DEFAULT_LOG_DIRECTIVE;
use tracing_subscriber::EnvFilter;

/// Build the log filter
///
/// `RUST_LOG` wins when set. Otherwise the crate logs at the configured level.
pub fn env_filter(config: &ReadinessConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config.log_level.trim().to_lowercase();
        if level.is_empty() || level == "info" {
            EnvFilter::new(DEFAULT_LOG_DIRECTIVE)
        } else {
            EnvFilter::new(format!("route_readiness={level}"))
        }
    })
}

/// Install the global subscriber
///
/// Returns `false` when a subscriber was already installed, which is expected
/// when many tests in one process call this.
///
/// Metrics are registered separately with
/// [`register_metrics`](crate::observability::register_metrics); `routectl` and
/// [`FixtureSetup::new`](crate::fixture::FixtureSetup::new) both do so.
pub fn init_tracing(config: &ReadinessConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_ansi(config.log_enable_color)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        let config = ReadinessConfig::default();
        init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
