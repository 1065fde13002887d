//! # Fixture Injection
//!
//! Binds ready routes into test fixtures.

pub mod injector;
pub mod setup;
pub mod slot;

pub use injector::{FixtureInjector, InjectionError};
pub use setup::{prepare_fixture, FixtureSetup, RouteFixture, RouteRequest, SetupError};
pub use slot::{FixtureSlot, SlotType};
