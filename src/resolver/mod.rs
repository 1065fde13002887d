//! # Route Resolver
//!
//! Turns a [`ServiceReference`] into a [`ResolvedRoute`] by expanding its
//! placeholders once and issuing a single read against the control plane.
//!
//! Resolution failures are never retried here: a missing route is a
//! configuration problem, not a readiness problem.

pub mod cache;
pub mod control_plane;
pub mod error;
pub mod kubernetes;

pub use cache::{CacheMode, RouteCache};
pub use control_plane::{ControlPlane, RouteRecord};
pub use error::{ControlPlaneError, ResolutionError};
pub use kubernetes::{KubeControlPlane, RouteKind};

use crate::config::{ReadinessConfig, TestProperties};
use crate::constants::FALLBACK_NAMESPACE;
use crate::observability::metrics;
use crate::route::{QualifiedReference, ResolvedRoute, ServiceReference};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Resolves service references against a control plane
#[derive(Clone)]
pub struct RouteResolver {
    control_plane: Arc<dyn ControlPlane>,
    properties: TestProperties,
    default_namespace: String,
    cache_mode: CacheMode,
    cache: RouteCache,
}

impl fmt::Debug for RouteResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteResolver")
            .field("default_namespace", &self.default_namespace)
            .field("cache_mode", &self.cache_mode)
            .field("cached_routes", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl RouteResolver {
    /// Resolver using the control plane's current namespace as default
    pub fn new(control_plane: Arc<dyn ControlPlane>, properties: TestProperties) -> Self {
        let default_namespace = control_plane
            .current_namespace()
            .filter(|ns| !ns.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_NAMESPACE.to_string());
        Self {
            control_plane,
            properties,
            default_namespace,
            cache_mode: CacheMode::PerClass,
            cache: RouteCache::new(),
        }
    }

    /// Resolver configured from [`ReadinessConfig`]
    pub fn from_config(
        control_plane: Arc<dyn ControlPlane>,
        properties: TestProperties,
        config: &ReadinessConfig,
    ) -> Self {
        let resolver = Self::new(control_plane, properties).with_cache_mode(config.cache_mode);
        match &config.namespace {
            Some(ns) => resolver.with_default_namespace(ns.clone()),
            None => resolver,
        }
    }

    #[must_use]
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    /// Share an existing cache (e.g. one owned by the test run) and enable sharing
    #[must_use]
    pub fn with_shared_cache(mut self, cache: RouteCache) -> Self {
        self.cache_mode = CacheMode::Shared;
        self.cache = cache;
        self
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    /// Expand placeholders without touching the control plane
    pub fn qualify(
        &self,
        reference: &ServiceReference,
    ) -> Result<QualifiedReference, ResolutionError> {
        reference.qualify(&self.properties, &self.default_namespace)
    }

    /// Resolve a reference to a route
    ///
    /// # Errors
    ///
    /// - [`ResolutionError::AmbiguousConfig`] before any network call when a
    ///   placeholder cannot be expanded
    /// - [`ResolutionError::NotFound`] when no route has exactly this name
    /// - [`ResolutionError::ControlPlaneUnavailable`] on transport or auth failures
    /// - [`ResolutionError::InvalidRoute`] when the route carries no usable URL
    pub async fn resolve(
        &self,
        reference: &ServiceReference,
    ) -> Result<ResolvedRoute, ResolutionError> {
        let span = info_span!(
            "route.resolve",
            service.reference = %reference,
            route.namespace = tracing::field::Empty,
            route.name = tracing::field::Empty,
            route.url = tracing::field::Empty,
            operation.duration_ms = tracing::field::Empty,
            operation.success = tracing::field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            let result = self.resolve_inner(reference).await;

            span_clone.record("operation.duration_ms", start.elapsed().as_millis() as u64);
            span_clone.record("operation.success", result.is_ok());
            match &result {
                Ok(route) => {
                    span_clone.record("route.url", route.url().as_str());
                    metrics::increment_route_resolutions();
                }
                Err(e) => {
                    warn!("Failed to resolve route for '{}': {}", reference, e);
                    metrics::increment_route_resolution_errors(e.kind());
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn resolve_inner(
        &self,
        reference: &ServiceReference,
    ) -> Result<ResolvedRoute, ResolutionError> {
        let qualified = self.qualify(reference)?;
        let span = tracing::Span::current();
        span.record("route.namespace", qualified.namespace());
        span.record("route.name", qualified.name());

        if self.cache_mode == CacheMode::Shared {
            if let Some(route) = self.cache.get(&qualified) {
                debug!("Using cached route for {}: {}", qualified, route.url());
                return Ok(route);
            }
        }

        let candidates = self
            .control_plane
            .find_routes(qualified.namespace(), qualified.name())
            .await
            .map_err(|e| control_plane_failure(&qualified, e))?;

        let Some(record) = candidates.iter().find(|r| r.name == qualified.name()) else {
            if !candidates.is_empty() {
                debug!(
                    "Ignoring {} route(s) without an exact name match for {}",
                    candidates.len(),
                    qualified
                );
            }
            return Err(ResolutionError::NotFound {
                reference: qualified.to_string(),
            });
        };

        let route = ResolvedRoute::from_record(qualified, record)?;
        info!("Resolved route {} to {}", route.reference(), route.url());

        Ok(match self.cache_mode {
            CacheMode::Shared => self.cache.insert_if_absent(route),
            CacheMode::PerClass => route,
        })
    }
}

fn control_plane_failure(
    reference: &QualifiedReference,
    error: ControlPlaneError,
) -> ResolutionError {
    match error {
        ControlPlaneError::Malformed(reason) => ResolutionError::InvalidRoute {
            reference: reference.to_string(),
            reason,
        },
        other => ResolutionError::ControlPlaneUnavailable {
            reference: reference.to_string(),
            reason: other.to_string(),
        },
    }
}
