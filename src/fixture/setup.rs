//! # Fixture Setup
//!
//! Runs resolve, await and inject for every route a fixture asks for.
//! Requests are processed in order and the first failure aborts setup; a
//! slot is only written once its route is ready.

use super::injector::{FixtureInjector, InjectionError};
use super::slot::FixtureSlot;
use crate::observability::metrics;
use crate::poller::{PollOutcome, PollPolicy, ReadinessPoller};
use crate::resolver::{ResolutionError, RouteResolver};
use crate::route::{ResolvedRoute, ServiceReference};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

/// One route a fixture wants injected
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub reference: ServiceReference,
    pub slot: String,
    /// Overrides the setup's default policy for this route
    pub policy: Option<PollPolicy>,
}

impl RouteRequest {
    pub fn new(reference: ServiceReference, slot: impl Into<String>) -> Self {
        Self {
            reference,
            slot: slot.into(),
            policy: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

/// A test fixture that receives route URLs
///
/// Implemented by the surrounding framework for each fixture type, replacing
/// annotation discovery with an explicit list of requests.
pub trait RouteFixture {
    /// Routes this fixture needs, in injection order
    fn route_requests(&self) -> Vec<RouteRequest>;

    /// Mutable access to a slot by name
    fn slot_mut(&mut self, name: &str) -> Option<&mut FixtureSlot>;
}

/// Why a fixture could not be prepared
///
/// Every variant is a setup failure, distinct from a failing test.
#[derive(Debug, Clone, Error)]
pub enum SetupError {
    #[error("cannot resolve route for slot '{slot}': {source}")]
    Resolution {
        slot: String,
        #[source]
        source: ResolutionError,
    },
    #[error("route '{reference}' for slot '{slot}' never became ready: {outcome}")]
    NotReady {
        slot: String,
        reference: String,
        outcome: PollOutcome,
    },
    #[error(transparent)]
    Injection(#[from] InjectionError),
}

impl SetupError {
    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SetupError::Resolution { .. } => "resolution",
            SetupError::NotReady { .. } => "not_ready",
            SetupError::Injection(_) => "injection",
        }
    }
}

/// Resolver, poller and injector wired together
#[derive(Debug, Clone)]
pub struct FixtureSetup {
    resolver: RouteResolver,
    poller: ReadinessPoller,
    injector: FixtureInjector,
    default_policy: PollPolicy,
    cancel: CancellationToken,
}

impl FixtureSetup {
    /// Wire the components together and register the crate metrics
    pub fn new(
        resolver: RouteResolver,
        poller: ReadinessPoller,
        default_policy: PollPolicy,
    ) -> Self {
        if let Err(e) = metrics::register_metrics() {
            warn!("Failed to register metrics: {}", e);
        }
        Self {
            resolver,
            poller,
            injector: FixtureInjector::new(),
            default_policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort pending readiness waits when `cancel` fires
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn resolver(&self) -> &RouteResolver {
        &self.resolver
    }

    /// Prepare every slot `fixture` requests
    ///
    /// Returns the ready routes in request order.
    ///
    /// # Errors
    ///
    /// Returns the first [`SetupError`] encountered. Slots before the failing
    /// request stay injected.
    pub async fn prepare<F>(&self, fixture: &mut F) -> Result<Vec<ResolvedRoute>, SetupError>
    where
        F: RouteFixture + ?Sized,
    {
        let requests = fixture.route_requests();
        let span = info_span!("fixture.prepare", fixture.routes = requests.len());

        async move {
            let mut routes = Vec::with_capacity(requests.len());
            for request in requests {
                let Some(slot) = fixture.slot_mut(&request.slot) else {
                    let err = SetupError::from(InjectionError::UnknownSlot {
                        slot: request.slot.clone(),
                    });
                    metrics::increment_fixture_setups(err.kind());
                    return Err(err);
                };
                match self.prepare_slot(slot, &request.reference, request.policy.as_ref()).await {
                    Ok(route) => routes.push(route),
                    Err(err) => {
                        metrics::increment_fixture_setups(err.kind());
                        return Err(err);
                    }
                }
            }
            metrics::increment_fixture_setups("ready");
            Ok(routes)
        }
        .instrument(span)
        .await
    }

    /// Resolve, await and inject a single slot
    ///
    /// The slot type is checked before any network call.
    ///
    /// # Errors
    ///
    /// See [`SetupError`].
    pub async fn prepare_slot(
        &self,
        slot: &mut FixtureSlot,
        reference: &ServiceReference,
        policy: Option<&PollPolicy>,
    ) -> Result<ResolvedRoute, SetupError> {
        self.injector.check(slot)?;

        let policy = policy.unwrap_or(&self.default_policy);
        let outcome = self
            .poller
            .resolve_and_await(&self.resolver, reference, policy, &self.cancel)
            .await;

        let route = match outcome {
            PollOutcome::Ready { route, .. } => route,
            PollOutcome::ResolutionFailed { cause } => {
                return Err(SetupError::Resolution {
                    slot: slot.name().to_string(),
                    source: cause,
                });
            }
            outcome => {
                return Err(SetupError::NotReady {
                    slot: slot.name().to_string(),
                    reference: reference.to_string(),
                    outcome,
                });
            }
        };

        self.injector.inject(slot, &route)?;
        info!("Injected {} into fixture slot '{}'", route.url(), slot.name());
        Ok(route)
    }
}

/// One-shot form of [`FixtureSetup::prepare`]
///
/// # Errors
///
/// See [`SetupError`].
pub async fn prepare_fixture<F>(
    resolver: &RouteResolver,
    poller: &ReadinessPoller,
    default_policy: &PollPolicy,
    fixture: &mut F,
) -> Result<Vec<ResolvedRoute>, SetupError>
where
    F: RouteFixture + ?Sized,
{
    FixtureSetup::new(resolver.clone(), poller.clone(), default_policy.clone())
        .prepare(fixture)
        .await
}
