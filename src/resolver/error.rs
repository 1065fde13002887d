//! # Resolution Errors

use thiserror::Error;

/// Why a service reference could not be turned into a route
///
/// Every variant is fatal for the current test class and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// No route object with exactly the requested name exists
    #[error("route '{reference}' not found")]
    NotFound { reference: String },
    /// Placeholder unresolved, or the name/namespace expanded to nothing
    #[error("ambiguous configuration for service '{reference}': {reason}")]
    AmbiguousConfig { reference: String, reason: String },
    /// Transport or authorization failure talking to the control plane
    #[error("control plane unavailable while resolving '{reference}': {reason}")]
    ControlPlaneUnavailable { reference: String, reason: String },
    /// The route object exists but carries no usable URL
    #[error("route '{reference}' is not usable: {reason}")]
    InvalidRoute { reference: String, reason: String },
}

impl ResolutionError {
    /// Short label used for metrics and span fields
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::NotFound { .. } => "not_found",
            ResolutionError::AmbiguousConfig { .. } => "ambiguous_config",
            ResolutionError::ControlPlaneUnavailable { .. } => "control_plane_unavailable",
            ResolutionError::InvalidRoute { .. } => "invalid_route",
        }
    }
}

/// Failure reported by a [`ControlPlane`](super::ControlPlane) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlPlaneError {
    #[error("unauthorized ({code}): {message}")]
    Unauthorized { code: u16, message: String },
    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed route object: {0}")]
    Malformed(String),
}
