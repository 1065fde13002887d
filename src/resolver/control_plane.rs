//! # Control Plane
//!
//! The read-only seam between the resolver and the cluster API.

use super::error::ControlPlaneError;
use async_trait::async_trait;

/// Route object as seen by the resolver
///
/// Only the fields needed to build a URL are kept; everything else about the
/// object stays with the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord {
    /// Object name
    pub name: String,
    /// Externally routable host, absent while the router has not admitted the route
    pub host: Option<String>,
    /// Path prefix the route is bound to
    pub path: Option<String>,
    /// Whether the route terminates TLS
    pub tls: bool,
}

impl RouteRecord {
    /// Absolute URL string for this record, or `None` when no host is assigned
    pub fn url_string(&self) -> Option<String> {
        let host = self.host.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
        let scheme = if self.tls { "https" } else { "http" };
        let path = match self.path.as_deref().map(str::trim) {
            None | Some("" | "/") => String::new(),
            Some(p) if p.starts_with('/') => p.to_string(),
            Some(p) => format!("/{p}"),
        };
        Some(format!("{scheme}://{host}{path}"))
    }
}

/// Read access to route objects
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Look up route objects named `name` in `namespace`
    ///
    /// Implementations may return more than one candidate; the resolver only
    /// accepts records whose name matches exactly. An empty list means the
    /// route does not exist.
    async fn find_routes(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<RouteRecord>, ControlPlaneError>;

    /// Namespace of the current client context, if the implementation has one
    fn current_namespace(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(host: Option<&str>, path: Option<&str>, tls: bool) -> RouteRecord {
        RouteRecord {
            name: "greeting-app".to_string(),
            host: host.map(str::to_string),
            path: path.map(str::to_string),
            tls,
        }
    }

    #[test]
    fn test_url_string_scheme_follows_tls() {
        assert_eq!(
            record(Some("a.example"), None, true).url_string().as_deref(),
            Some("https://a.example")
        );
        assert_eq!(
            record(Some("a.example"), None, false).url_string().as_deref(),
            Some("http://a.example")
        );
    }

    #[test]
    fn test_url_string_normalizes_path() {
        assert_eq!(
            record(Some("a.example"), Some("api"), false).url_string().as_deref(),
            Some("http://a.example/api")
        );
        assert_eq!(
            record(Some("a.example"), Some("/"), false).url_string().as_deref(),
            Some("http://a.example")
        );
    }

    #[test]
    fn test_url_string_requires_host() {
        assert_eq!(record(None, None, true).url_string(), None);
        assert_eq!(record(Some("  "), None, true).url_string(), None);
    }
}
