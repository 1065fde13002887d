//! # Metrics
//!
//! Prometheus metrics for route resolution and readiness polling.
//!
//! ## Metrics Exposed
//!
//! - `route_readiness_resolutions_total` - Successful route resolutions
//! - `route_readiness_resolution_errors_total` - Failed resolutions by error kind
//! - `route_readiness_probe_attempts_total` - Probe requests issued
//! - `route_readiness_probe_failures_total` - Failed probes by failure kind
//! - `route_readiness_outcomes_total` - Finished waits by outcome
//! - `route_readiness_wait_duration_seconds` - Time from first probe to ready or timeout
//! - `route_readiness_fixture_setups_total` - Fixture setups by result

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static ROUTE_RESOLUTIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "route_readiness_resolutions_total",
        "Total number of successful route resolutions",
    )
    .expect("Failed to create ROUTE_RESOLUTIONS_TOTAL metric - this should never happen")
});

static ROUTE_RESOLUTION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "route_readiness_resolution_errors_total",
            "Total number of failed route resolutions by error kind",
        ),
        &["kind"],
    )
    .expect("Failed to create ROUTE_RESOLUTION_ERRORS_TOTAL metric - this should never happen")
});

static PROBE_ATTEMPTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "route_readiness_probe_attempts_total",
        "Total number of readiness probe requests",
    )
    .expect("Failed to create PROBE_ATTEMPTS_TOTAL metric - this should never happen")
});

static PROBE_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "route_readiness_probe_failures_total",
            "Total number of failed readiness probes by failure kind",
        ),
        &["kind"],
    )
    .expect("Failed to create PROBE_FAILURES_TOTAL metric - this should never happen")
});

static READINESS_OUTCOMES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "route_readiness_outcomes_total",
            "Total number of finished readiness waits by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create READINESS_OUTCOMES_TOTAL metric - this should never happen")
});

static READINESS_WAIT_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "route_readiness_wait_duration_seconds",
            "Time spent waiting for a route to become ready in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
    )
    .expect("Failed to create READINESS_WAIT_DURATION metric - this should never happen")
});

static FIXTURE_SETUPS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "route_readiness_fixture_setups_total",
            "Total number of fixture setups by result",
        ),
        &["result"],
    )
    .expect("Failed to create FIXTURE_SETUPS_TOTAL metric - this should never happen")
});

/// Register all metrics with the crate registry
///
/// Safe to call more than once; collectors that are already registered are
/// skipped.
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    register(Box::new(ROUTE_RESOLUTIONS_TOTAL.clone()))?;
    register(Box::new(ROUTE_RESOLUTION_ERRORS_TOTAL.clone()))?;
    register(Box::new(PROBE_ATTEMPTS_TOTAL.clone()))?;
    register(Box::new(PROBE_FAILURES_TOTAL.clone()))?;
    register(Box::new(READINESS_OUTCOMES_TOTAL.clone()))?;
    register(Box::new(READINESS_WAIT_DURATION.clone()))?;
    register(Box::new(FIXTURE_SETUPS_TOTAL.clone()))?;

    Ok(())
}

fn register(collector: Box<dyn prometheus::core::Collector>) -> Result<()> {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Render all registered metrics in the Prometheus text format
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn gather_text() -> Result<String> {
    Ok(TextEncoder::new().encode_to_string(&REGISTRY.gather())?)
}

pub fn increment_route_resolutions() {
    ROUTE_RESOLUTIONS_TOTAL.inc();
}

pub fn increment_route_resolution_errors(kind: &str) {
    ROUTE_RESOLUTION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_probe_attempts() {
    PROBE_ATTEMPTS_TOTAL.inc();
}

pub fn increment_probe_failures(kind: &str) {
    PROBE_FAILURES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_readiness_outcome(outcome: &str) {
    READINESS_OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn observe_readiness_wait_duration(duration: f64) {
    READINESS_WAIT_DURATION.observe(duration);
}

pub fn increment_fixture_setups(result: &str) {
    FIXTURE_SETUPS_TOTAL.with_label_values(&[result]).inc();
}
