//! # Route Resolver Tests
//!
//! Resolution against an in-memory control plane: success, not-found without
//! retries, placeholder failures before any network call, control-plane
//! failures, and the shared cache.

mod common;

use common::{record, FakeControlPlane};
use route_readiness::config::TestProperties;
use route_readiness::resolver::{
    CacheMode, ControlPlaneError, ResolutionError, RouteCache, RouteRecord, RouteResolver,
};
use route_readiness::route::ServiceReference;
use std::sync::Arc;

fn resolver(control_plane: &Arc<FakeControlPlane>) -> RouteResolver {
    RouteResolver::new(control_plane.clone(), TestProperties::isolated())
        .with_default_namespace("tests")
}

#[tokio::test]
async fn test_resolve_existing_route() {
    let control_plane = Arc::new(
        FakeControlPlane::new().with_route(
            "tests",
            record("greeting-app", "greeting-app.example-cluster.local", true),
        ),
    );

    let route = resolver(&control_plane)
        .resolve(&ServiceReference::new("greeting-app"))
        .await
        .unwrap();

    assert_eq!(route.url().as_str(), "https://greeting-app.example-cluster.local/");
    assert!(route.url().has_host());
    assert_eq!(route.reference().to_string(), "tests/greeting-app");
    assert_eq!(control_plane.calls(), 1);
}

#[tokio::test]
async fn test_missing_route_is_not_found_without_retry() {
    let control_plane = Arc::new(FakeControlPlane::new());

    let err = resolver(&control_plane)
        .resolve(&ServiceReference::new("greeting-app"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ResolutionError::NotFound {
            reference: "tests/greeting-app".to_string()
        }
    );
    assert_eq!(control_plane.calls(), 1);
}

#[tokio::test]
async fn test_only_exact_name_matches() {
    let control_plane = Arc::new(
        FakeControlPlane::new()
            .with_route("tests", record("greeting-app-canary", "canary.example", false))
            .with_route("tests", record("greeting", "greeting.example", false)),
    );

    let err = resolver(&control_plane)
        .resolve(&ServiceReference::new("greeting-app"))
        .await
        .unwrap_err();

    assert!(matches!(err, ResolutionError::NotFound { .. }));
}

#[tokio::test]
async fn test_unresolved_placeholder_fails_before_network_call() {
    let control_plane = Arc::new(FakeControlPlane::new());

    let err = resolver(&control_plane)
        .resolve(&ServiceReference::new("${app.name}"))
        .await
        .unwrap_err();

    assert!(matches!(err, ResolutionError::AmbiguousConfig { .. }), "{err}");
    assert_eq!(control_plane.calls(), 0);
}

#[tokio::test]
async fn test_nested_placeholder_default_fails_before_network_call() {
    let control_plane = Arc::new(FakeControlPlane::new());

    let err = resolver(&control_plane)
        .resolve(&ServiceReference::new("${app.name:${fallback.name}}"))
        .await
        .unwrap_err();

    assert!(matches!(err, ResolutionError::AmbiguousConfig { .. }), "{err}");
    assert_eq!(control_plane.calls(), 0);
}

#[tokio::test]
async fn test_placeholder_expanded_from_properties() {
    let control_plane = Arc::new(FakeControlPlane::new().with_route(
        "staging",
        record("greeting-app", "greeting-app.staging.example", false),
    ));
    let properties = TestProperties::isolated()
        .with("app.name", "greeting-app")
        .with("app.namespace", "staging");

    let route = RouteResolver::new(control_plane.clone(), properties)
        .resolve(&ServiceReference::in_namespace("${app.name}", "${app.namespace}"))
        .await
        .unwrap();

    assert_eq!(route.url().as_str(), "http://greeting-app.staging.example/");
    assert_eq!(route.reference().namespace(), "staging");
}

#[tokio::test]
async fn test_default_namespace_comes_from_control_plane() {
    let control_plane = Arc::new(FakeControlPlane::new().in_namespace("ci-1234"));
    let resolver = RouteResolver::new(control_plane, TestProperties::isolated());
    assert_eq!(resolver.default_namespace(), "ci-1234");

    let fallback =
        RouteResolver::new(Arc::new(FakeControlPlane::new()), TestProperties::isolated());
    assert_eq!(fallback.default_namespace(), "default");
}

#[tokio::test]
async fn test_control_plane_failures_are_unavailable() {
    let control_plane = Arc::new(FakeControlPlane::new().failing(ControlPlaneError::Unauthorized {
        code: 403,
        message: "routes.route.openshift.io is forbidden".to_string(),
    }));

    let err = resolver(&control_plane)
        .resolve(&ServiceReference::new("greeting-app"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "control_plane_unavailable");
    assert!(err.to_string().contains("forbidden"));
    assert_eq!(control_plane.calls(), 1);
}

#[tokio::test]
async fn test_route_without_host_is_invalid() {
    let control_plane = Arc::new(FakeControlPlane::new().with_route(
        "tests",
        RouteRecord {
            name: "greeting-app".to_string(),
            host: None,
            path: None,
            tls: false,
        },
    ));

    let err = resolver(&control_plane)
        .resolve(&ServiceReference::new("greeting-app"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "invalid_route");
}

#[tokio::test]
async fn test_per_class_mode_resolves_every_time() {
    let control_plane = Arc::new(
        FakeControlPlane::new().with_route("tests", record("greeting-app", "a.example", false)),
    );
    let resolver = resolver(&control_plane);
    let reference = ServiceReference::new("greeting-app");

    resolver.resolve(&reference).await.unwrap();
    resolver.resolve(&reference).await.unwrap();

    assert_eq!(control_plane.calls(), 2);
    assert!(resolver.cache().is_empty());
}

#[tokio::test]
async fn test_shared_cache_resolves_once_across_resolvers() {
    let control_plane = Arc::new(
        FakeControlPlane::new().with_route("tests", record("greeting-app", "a.example", false)),
    );
    let cache = RouteCache::new();
    let first_class = resolver(&control_plane).with_shared_cache(cache.clone());
    let second_class = resolver(&control_plane).with_shared_cache(cache.clone());
    let reference = ServiceReference::new("greeting-app");

    let first = first_class.resolve(&reference).await.unwrap();
    let second = second_class.resolve(&reference).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(control_plane.calls(), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_shared_cache_never_stores_failures() {
    let control_plane = Arc::new(FakeControlPlane::new());
    let resolver = resolver(&control_plane).with_cache_mode(CacheMode::Shared);
    let reference = ServiceReference::new("greeting-app");

    assert!(resolver.resolve(&reference).await.is_err());
    assert!(resolver.resolve(&reference).await.is_err());

    assert_eq!(control_plane.calls(), 2);
    assert!(resolver.cache().is_empty());
}

#[tokio::test]
async fn test_concurrent_resolutions_share_one_entry() {
    let control_plane = Arc::new(
        FakeControlPlane::new().with_route("tests", record("greeting-app", "a.example", false)),
    );
    let cache = RouteCache::new();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let resolver = resolver(&control_plane).with_shared_cache(cache.clone());
            tokio::spawn(async move {
                resolver
                    .resolve(&ServiceReference::new("greeting-app"))
                    .await
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        let route = handle.await.unwrap();
        assert_eq!(route.url().as_str(), "http://a.example/");
    }
    assert_eq!(cache.len(), 1);
}
