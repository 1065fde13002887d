//! Commonly used types

pub use crate::config::{ReadinessConfig, TestProperties};
pub use crate::fixture::{
    prepare_fixture, FixtureInjector, FixtureSetup, FixtureSlot, InjectionError, RouteFixture,
    RouteRequest, SetupError, SlotType,
};
pub use crate::poller::{
    HttpProbe, PollOutcome, PollPolicy, Probe, ProbeFailure, ProbeMethod, ProbeResponse,
    ReadinessPoller, SuccessPredicate,
};
pub use crate::resolver::{
    CacheMode, ControlPlane, KubeControlPlane, ResolutionError, RouteCache, RouteKind,
    RouteResolver,
};
pub use crate::route::{ResolvedRoute, ServiceReference};
