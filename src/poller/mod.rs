//! # Readiness Poller
//!
//! Probes a resolved route at a fixed cadence until it answers with a response
//! the success predicate accepts, or until the overall timeout elapses.
//!
//! Every failed attempt (connection refused, request timeout, rejected status)
//! is "not yet ready", and the poller sleeps one interval before the next
//! attempt. There is no backoff, and exactly one probe is in flight.
//!
//! For interval `i` and timeout `t`:
//!
//! - the last sleep is shortened so it never runs past `t`
//! - a route that fails `n` times and then succeeds, with `n * i < t` and
//!   prompt probe answers, is reported `Ready` after `n + 1` attempts
//! - `TimedOut` is reported with an elapsed time in `[t, t + request_timeout)`
//! - `attempts` counts probes that were started and not cancelled

pub mod policy;
pub mod predicate;
pub mod probe;

pub use policy::{PolicyError, PollPolicy, ProbeMethod};
pub use predicate::{ProbeResponse, SuccessPredicate};
pub use probe::{HttpProbe, Probe, ProbeFailure, ProbeRequest};

use crate::observability::metrics;
use crate::resolver::{ResolutionError, RouteResolver};
use crate::route::{ResolvedRoute, ServiceReference};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Result of waiting for a route
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// A probe satisfied the success predicate
    Ready {
        route: ResolvedRoute,
        attempts: u32,
        elapsed: Duration,
    },
    /// The overall timeout elapsed first
    TimedOut {
        last_error: ProbeFailure,
        attempts: u32,
        elapsed: Duration,
    },
    /// The route could not be resolved, so nothing was probed
    ResolutionFailed { cause: ResolutionError },
    /// The wait was aborted through its cancellation token
    Cancelled {
        last_error: Option<ProbeFailure>,
        attempts: u32,
        elapsed: Duration,
    },
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }

    /// Number of probe attempts made, zero when resolution failed
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Ready { attempts, .. }
            | PollOutcome::TimedOut { attempts, .. }
            | PollOutcome::Cancelled { attempts, .. } => *attempts,
            PollOutcome::ResolutionFailed { .. } => 0,
        }
    }

    /// The ready route, if any
    pub fn into_route(self) -> Option<ResolvedRoute> {
        match self {
            PollOutcome::Ready { route, .. } => Some(route),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            PollOutcome::Ready { .. } => "ready",
            PollOutcome::TimedOut { .. } => "timed_out",
            PollOutcome::ResolutionFailed { .. } => "resolution_failed",
            PollOutcome::Cancelled { .. } => "cancelled",
        }
    }
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollOutcome::Ready {
                route,
                attempts,
                elapsed,
            } => write!(f, "{route} ready after {attempts} attempt(s) in {elapsed:?}"),
            PollOutcome::TimedOut {
                last_error,
                attempts,
                elapsed,
            } => write!(
                f,
                "not ready after {attempts} attempt(s) in {elapsed:?}; last error: {last_error}"
            ),
            PollOutcome::ResolutionFailed { cause } => write!(f, "resolution failed: {cause}"),
            PollOutcome::Cancelled {
                last_error,
                attempts,
                elapsed,
            } => {
                write!(f, "cancelled after {attempts} attempt(s) in {elapsed:?}")?;
                match last_error {
                    Some(e) => write!(f, "; last error: {e}"),
                    None => Ok(()),
                }
            }
        }
    }
}

/// Waits for resolved routes to answer HTTP traffic
#[derive(Clone)]
pub struct ReadinessPoller {
    probe: Arc<dyn Probe>,
}

impl fmt::Debug for ReadinessPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessPoller").finish_non_exhaustive()
    }
}

impl ReadinessPoller {
    pub fn new(probe: Arc<dyn Probe>) -> Self {
        Self { probe }
    }

    /// Poller using a real HTTP client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn http(accept_invalid_certs: bool) -> Result<Self, reqwest::Error> {
        Ok(Self::new(Arc::new(HttpProbe::new(accept_invalid_certs)?)))
    }

    /// Probe `route` until it is ready or `policy.timeout()` elapses
    pub async fn await_ready(&self, route: ResolvedRoute, policy: &PollPolicy) -> PollOutcome {
        self.await_ready_with_cancel(route, policy, &CancellationToken::new())
            .await
    }

    /// Like [`await_ready`](Self::await_ready), aborting when `cancel` fires
    ///
    /// Cancellation is observed both during a probe and while sleeping between
    /// probes.
    pub async fn await_ready_with_cancel(
        &self,
        route: ResolvedRoute,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let span = info_span!(
            "route.await_ready",
            route.url = %route.url(),
            poll.interval_ms = policy.interval().as_millis() as u64,
            poll.timeout_ms = policy.timeout().as_millis() as u64,
            poll.attempts = tracing::field::Empty,
            poll.outcome = tracing::field::Empty,
        );
        let span_clone = span.clone();

        async move {
            let outcome = self.poll(route, policy, cancel).await;

            span_clone.record("poll.attempts", outcome.attempts());
            span_clone.record("poll.outcome", outcome.label());
            metrics::increment_readiness_outcome(outcome.label());
            match &outcome {
                PollOutcome::Ready { elapsed, .. } => {
                    metrics::observe_readiness_wait_duration(elapsed.as_secs_f64());
                    info!("{}", outcome);
                }
                PollOutcome::TimedOut { elapsed, .. } => {
                    metrics::observe_readiness_wait_duration(elapsed.as_secs_f64());
                    warn!("Route {}", outcome);
                }
                _ => warn!("Readiness wait ended: {}", outcome),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    /// Resolve `reference` and wait for the resulting route
    ///
    /// Resolution failures are reported as [`PollOutcome::ResolutionFailed`]
    /// without any probing.
    pub async fn resolve_and_await(
        &self,
        resolver: &RouteResolver,
        reference: &ServiceReference,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        match resolver.resolve(reference).await {
            Ok(route) => self.await_ready_with_cancel(route, policy, cancel).await,
            Err(cause) => PollOutcome::ResolutionFailed { cause },
        }
    }

    async fn poll(
        &self,
        route: ResolvedRoute,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let url = match route.probe_url(policy.path()) {
            Ok(url) => url,
            Err(e) => {
                return PollOutcome::ResolutionFailed {
                    cause: ResolutionError::InvalidRoute {
                        reference: route.reference().to_string(),
                        reason: format!(
                            "cannot join probe path '{}': {e}",
                            policy.path().unwrap_or_default()
                        ),
                    },
                };
            }
        };
        let request = ProbeRequest {
            url,
            method: policy.method(),
            read_body: policy.predicate().needs_body(),
            timeout: policy.request_timeout(),
        };

        debug!(
            "Waiting for {} {} (interval {:?}, timeout {:?}, expecting {})",
            request.method,
            request.url,
            policy.interval(),
            policy.timeout(),
            policy.predicate().describe()
        );

        let start = Instant::now();
        let mut attempts: u32 = 0;
        let mut last_error: Option<ProbeFailure> = None;

        loop {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return PollOutcome::Cancelled {
                        last_error,
                        attempts,
                        elapsed: start.elapsed(),
                    };
                }
                result = self.probe_once(&request) => result,
            };
            attempts += 1;
            metrics::increment_probe_attempts();

            match classify(result, policy.predicate()) {
                Ok(status) => {
                    debug!("Attempt {} got HTTP {}", attempts, status);
                    return PollOutcome::Ready {
                        route,
                        attempts,
                        elapsed: start.elapsed(),
                    };
                }
                Err(failure) => {
                    debug!("Attempt {} not ready: {}", attempts, failure);
                    metrics::increment_probe_failures(failure.kind());
                    last_error = Some(failure);
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= policy.timeout() {
                return timed_out(last_error, attempts, elapsed);
            }

            let pause = policy.interval().min(policy.timeout() - elapsed);
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return PollOutcome::Cancelled {
                        last_error,
                        attempts,
                        elapsed: start.elapsed(),
                    };
                }
                () = tokio::time::sleep(pause) => {}
            }

            let elapsed = start.elapsed();
            if elapsed >= policy.timeout() {
                return timed_out(last_error, attempts, elapsed);
            }
        }
    }

    async fn probe_once(&self, request: &ProbeRequest) -> Result<ProbeResponse, ProbeFailure> {
        match tokio::time::timeout(request.timeout, self.probe.probe(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeFailure::RequestTimeout(request.timeout)),
        }
    }
}

fn classify(
    result: Result<ProbeResponse, ProbeFailure>,
    predicate: &SuccessPredicate,
) -> Result<u16, ProbeFailure> {
    let response = result?;
    if predicate.accepts(&response) {
        Ok(response.status)
    } else {
        Err(ProbeFailure::Rejected {
            status: response.status,
            expected: predicate.describe(),
        })
    }
}

fn timed_out(last_error: Option<ProbeFailure>, attempts: u32, elapsed: Duration) -> PollOutcome {
    PollOutcome::TimedOut {
        // At least one attempt always precedes a timeout check
        last_error: last_error
            .unwrap_or_else(|| ProbeFailure::Transport("no probe attempt completed".to_string())),
        attempts,
        elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rejects_unaccepted_status() {
        let failure =
            classify(Ok(ProbeResponse::new(503)), &SuccessPredicate::default()).unwrap_err();
        assert_eq!(
            failure,
            ProbeFailure::Rejected {
                status: 503,
                expected: "status 2xx/3xx".to_string()
            }
        );
    }

    #[test]
    fn test_classify_passes_transport_errors_through() {
        let failure = classify(
            Err(ProbeFailure::Transport("connection refused".to_string())),
            &SuccessPredicate::default(),
        )
        .unwrap_err();
        assert_eq!(failure.kind(), "transport");
    }

    #[test]
    fn test_outcome_display() {
        let outcome = PollOutcome::TimedOut {
            last_error: ProbeFailure::Rejected {
                status: 503,
                expected: "status 2xx/3xx".to_string(),
            },
            attempts: 15,
            elapsed: Duration::from_secs(30),
        };
        assert_eq!(
            outcome.to_string(),
            concat!(
                "not ready after 15 attempt(s) in 30s; ",
                "last error: HTTP 503 response did not satisfy status 2xx/3xx"
            )
        );
        assert_eq!(outcome.attempts(), 15);
        assert!(!outcome.is_ready());
    }
}
