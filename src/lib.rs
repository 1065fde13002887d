//! Route Readiness
//!
//! Locates the externally routable URL of a service deployed into a cluster,
//! waits until that URL answers HTTP traffic, and binds it into a test
//! fixture before any test method runs.
//!
//! The pipeline is `RouteResolver` → `ReadinessPoller` → `FixtureInjector`:
//!
//! ```no_run
//! use route_readiness::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! route_readiness::install_crypto_provider();
//! let config = ReadinessConfig::from_env();
//! let control_plane = KubeControlPlane::try_default(config.route_kind).await?;
//! let resolver =
//!     RouteResolver::from_config(Arc::new(control_plane), TestProperties::new(), &config);
//! let poller = ReadinessPoller::http(config.probe_accept_invalid_certs)?;
//!
//! let route = resolver.resolve(&ServiceReference::new("${app.name}")).await?;
//! let outcome = poller.await_ready(route, &config.poll_policy()?).await;
//! assert!(outcome.is_ready());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod fixture;
pub mod observability;
pub mod poller;
pub mod prelude;
pub mod resolver;
pub mod route;

/// Install the ring crypto provider for rustls
///
/// Must run before the first Kubernetes client is built. Returns `false` when
/// a provider was already installed.
pub fn install_crypto_provider() -> bool {
    rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok()
}
