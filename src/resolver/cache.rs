//! # Resolution Cache
//!
//! Optional sharing of resolved routes between test classes.
//!
//! Sharing changes staleness semantics: a route that is edited mid-run keeps
//! its first resolved URL until it is invalidated. `PerClass` is therefore the
//! default.

use crate::route::{QualifiedReference, ResolvedRoute};
use dashmap::DashMap;
use std::sync::Arc;

/// Whether resolved routes outlive the test class that resolved them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Every resolution queries the control plane
    #[default]
    PerClass,
    /// The first successful resolution per reference is reused
    Shared,
}

/// Concurrent insert-if-absent map from expanded reference to route
///
/// Cloning shares the underlying map. Failed resolutions are never stored.
#[derive(Debug, Clone, Default)]
pub struct RouteCache {
    routes: Arc<DashMap<QualifiedReference, ResolvedRoute>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reference: &QualifiedReference) -> Option<ResolvedRoute> {
        self.routes.get(reference).map(|entry| entry.value().clone())
    }

    /// Store `route` unless another task stored one first
    ///
    /// Returns the route that is cached after the call, which is the earlier
    /// entry when two test classes race on the same reference.
    pub fn insert_if_absent(&self, route: ResolvedRoute) -> ResolvedRoute {
        self.routes
            .entry(route.reference().clone())
            .or_insert(route)
            .value()
            .clone()
    }

    /// Drop the entry for one reference
    pub fn invalidate(&self, reference: &QualifiedReference) -> bool {
        self.routes.remove(reference).is_some()
    }

    pub fn clear(&self) {
        self.routes.clear();
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
