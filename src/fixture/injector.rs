//! # Fixture Injector
//!
//! Pure binder from a ready route to a fixture slot. No network I/O happens
//! here.

use super::slot::{FixtureSlot, SlotType};
use crate::route::ResolvedRoute;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectionError {
    /// The slot is not URL-shaped
    #[error("fixture slot '{slot}' is declared as {declared}, expected url")]
    TypeMismatch { slot: String, declared: SlotType },
    /// A route request names a slot the fixture does not have
    #[error("fixture has no slot named '{slot}'")]
    UnknownSlot { slot: String },
}

/// Binds resolved routes into fixture slots
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureInjector;

impl FixtureInjector {
    pub fn new() -> Self {
        Self
    }

    /// Check that `slot` can receive a route
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError::TypeMismatch`] for non-URL slots.
    pub fn check(&self, slot: &FixtureSlot) -> Result<(), InjectionError> {
        match slot.declared() {
            SlotType::Url => Ok(()),
            declared => Err(InjectionError::TypeMismatch {
                slot: slot.name().to_string(),
                declared: declared.clone(),
            }),
        }
    }

    /// Write the route URL into `slot`
    ///
    /// Injecting the same route again leaves the slot unchanged; injecting a
    /// different route overwrites the earlier value.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError::TypeMismatch`] for non-URL slots. The slot is
    /// not modified in that case.
    pub fn inject(
        &self,
        slot: &mut FixtureSlot,
        route: &ResolvedRoute,
    ) -> Result<(), InjectionError> {
        self.check(slot)?;
        if let Some(existing) = slot.value() {
            if existing != route.url() {
                debug!(
                    "Replacing {} in fixture slot '{}' with {}",
                    existing,
                    slot.name(),
                    route.url()
                );
            }
        }
        slot.bind(route.url().clone());
        Ok(())
    }
}
