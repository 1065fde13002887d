//! # Route Model
//!
//! Types describing what to look up and what was found:
//!
//! - [`ServiceReference`]: the logical service as written by the test author,
//!   possibly containing placeholders
//! - [`QualifiedReference`]: the same reference after placeholder expansion and
//!   namespace defaulting; the only form that reaches the control plane
//! - [`ResolvedRoute`]: an absolute, validated URL for the service

pub mod placeholder;

use crate::config::TestProperties;
use crate::resolver::{ResolutionError, RouteRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Logical service to locate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReference {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

impl ServiceReference {
    /// Reference in the configured current namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Reference in an explicit namespace
    pub fn in_namespace(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns true when the name or namespace contains placeholders
    pub fn is_templated(&self) -> bool {
        placeholder::is_templated(&self.name)
            || self.namespace.as_deref().is_some_and(placeholder::is_templated)
    }

    /// Expand placeholders and apply the default namespace
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::AmbiguousConfig`] when a placeholder cannot be
    /// expanded or the expanded name is empty.
    pub fn qualify(
        &self,
        properties: &TestProperties,
        default_namespace: &str,
    ) -> Result<QualifiedReference, ResolutionError> {
        let ambiguous = |reason: String| ResolutionError::AmbiguousConfig {
            reference: self.to_string(),
            reason,
        };

        let name = placeholder::expand(&self.name, properties)
            .map_err(|e| ambiguous(e.to_string()))?
            .trim()
            .to_string();
        if name.is_empty() {
            return Err(ambiguous("service name is empty".to_string()));
        }

        let namespace = match &self.namespace {
            Some(ns) => placeholder::expand(ns, properties)
                .map_err(|e| ambiguous(e.to_string()))?
                .trim()
                .to_string(),
            None => default_namespace.trim().to_string(),
        };
        if namespace.is_empty() {
            return Err(ambiguous("namespace is empty".to_string()));
        }

        Ok(QualifiedReference { namespace, name })
    }
}

impl fmt::Display for ServiceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Fully expanded service reference
///
/// Also the key of the shared resolution cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedReference {
    namespace: String,
    name: String,
}

impl QualifiedReference {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for QualifiedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Externally routable URL for a service
///
/// The URL is always absolute with an `http` or `https` scheme and a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    reference: QualifiedReference,
    url: Url,
    resolved_at: DateTime<Utc>,
}

impl ResolvedRoute {
    /// Build a route from a control-plane record
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::InvalidRoute`] when the record has no host or
    /// does not form an absolute http(s) URL.
    pub fn from_record(
        reference: QualifiedReference,
        record: &RouteRecord,
    ) -> Result<Self, ResolutionError> {
        let Some(url) = record.url_string() else {
            return Err(ResolutionError::InvalidRoute {
                reference: reference.to_string(),
                reason: "route has no host assigned yet".to_string(),
            });
        };
        Self::parse(reference, &url)
    }

    /// Build a route from a URL string
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::InvalidRoute`] for anything but an absolute
    /// http(s) URL with a host.
    pub fn parse(reference: QualifiedReference, url: &str) -> Result<Self, ResolutionError> {
        let invalid = |reason: String| ResolutionError::InvalidRoute {
            reference: reference.to_string(),
            reason,
        };

        let url = Url::parse(url.trim()).map_err(|e| invalid(format!("'{url}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid(format!("'{url}' has no host")));
        }

        Ok(Self {
            reference,
            url,
            resolved_at: Utc::now(),
        })
    }

    pub fn reference(&self) -> &QualifiedReference {
        &self.reference
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }

    /// URL a probe should hit, with an optional path joined onto the route path
    ///
    /// # Errors
    ///
    /// Returns the parse error when `path` cannot be joined.
    pub fn probe_url(&self, path: Option<&str>) -> Result<Url, url::ParseError> {
        match path {
            None => Ok(self.url.clone()),
            Some(path) => append_path(&self.url, path),
        }
    }
}

/// Append `path` below the path of `base`
///
/// Unlike [`Url::join`], a leading `/` does not replace the base path:
/// `/health` on `http://host/api` gives `http://host/api/health`.
///
/// # Errors
///
/// Returns the parse error when the combined URL is invalid.
pub fn append_path(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/'))
}

impl fmt::Display for ResolvedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}
