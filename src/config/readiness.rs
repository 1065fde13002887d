//! # Readiness Configuration
//!
//! Resolution and polling settings loaded from environment variables.

use crate::poller::{PollPolicy, PolicyError};
use crate::resolver::{CacheMode, RouteKind};
use std::time::Duration;

/// Readiness configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// The surrounding test framework usually exports these from its own configuration
/// before the first test class starts.
#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    /// Time between probe attempts (milliseconds)
    pub poll_interval_ms: u64,
    /// Maximum total wait for a route to become ready (seconds)
    pub poll_timeout_secs: u64,
    /// Per-probe request timeout (milliseconds)
    /// Clamped below the poll interval when the policy is built
    pub probe_timeout_ms: u64,
    /// Namespace override
    /// When unset, the current namespace of the Kubernetes client context is used
    pub namespace: Option<String>,
    /// Kind of control-plane object that carries the route
    pub route_kind: RouteKind,
    /// Whether resolved routes are shared between test classes
    pub cache_mode: CacheMode,
    /// Path appended to the route URL for probes (e.g. "/actuator/health")
    pub probe_path: Option<String>,
    /// Accept self-signed route certificates when probing
    pub probe_accept_invalid_certs: bool,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Enable color in text format logs
    pub log_enable_color: bool,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            namespace: None,
            route_kind: RouteKind::OpenShiftRoute,
            cache_mode: CacheMode::PerClass,
            probe_path: None,
            probe_accept_invalid_certs: false,
            log_level: "INFO".to_string(),
            log_enable_color: false,
        }
    }
}

impl ReadinessConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            poll_interval_ms: env_var_or_default(
                "ROUTE_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            ),
            poll_timeout_secs: env_var_or_default(
                "ROUTE_POLL_TIMEOUT_SECS",
                DEFAULT_POLL_TIMEOUT_SECS,
            ),
            probe_timeout_ms: env_var_or_default(
                "ROUTE_PROBE_TIMEOUT_MS",
                DEFAULT_PROBE_TIMEOUT_MS,
            ),
            namespace: env_var_non_empty("ROUTE_NAMESPACE"),
            route_kind: env_var_or_default("ROUTE_KIND", RouteKind::OpenShiftRoute),
            cache_mode: if env_var_or_default_bool("ROUTE_CACHE_SHARED", false) {
                CacheMode::Shared
            } else {
                CacheMode::PerClass
            },
            probe_path: env_var_non_empty("ROUTE_PROBE_PATH"),
            probe_accept_invalid_certs: env_var_or_default_bool("ROUTE_PROBE_INSECURE", false),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_enable_color: env_var_or_default_bool("LOG_ENABLE_COLOR", false),
        }
    }

    /// Get poll interval duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Get poll timeout duration
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    /// Get probe request timeout duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Build the default poll policy described by this configuration
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the interval or timeout is zero.
    pub fn poll_policy(&self) -> Result<PollPolicy, PolicyError> {
        let policy = PollPolicy::new(self.poll_interval(), self.poll_timeout())?
            .with_request_timeout(self.probe_timeout());
        Ok(match &self.probe_path {
            Some(path) => policy.with_path(path.clone()),
            None => policy,
        })
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read environment variable, treating blank values as unset
fn env_var_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
