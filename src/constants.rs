//! # Constants
//!
//! Shared constants used throughout the crate.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default time between readiness probe attempts (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default maximum total wait for a route to become ready (seconds)
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 300;

/// Default per-probe request timeout (milliseconds)
/// Clamped below the poll interval when a policy is built
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 800;

/// Fraction of the poll interval a probe may use when the configured request
/// timeout is not strictly shorter than the interval
pub const PROBE_TIMEOUT_INTERVAL_RATIO: f64 = 0.9;

/// Maximum number of response body bytes read by a probe
/// Only relevant for predicates that inspect the body
pub const MAX_PROBE_BODY_BYTES: usize = 64 * 1024;

/// Namespace used when neither configuration nor the client context names one
pub const FALLBACK_NAMESPACE: &str = "default";

/// OpenShift Route API group
pub const OPENSHIFT_ROUTE_GROUP: &str = "route.openshift.io";

/// OpenShift Route API version
pub const OPENSHIFT_ROUTE_VERSION: &str = "v1";

/// OpenShift Route kind
pub const OPENSHIFT_ROUTE_KIND: &str = "Route";

/// Default tracing directive when `RUST_LOG` is not set
pub const DEFAULT_LOG_DIRECTIVE: &str = "route_readiness=info";
