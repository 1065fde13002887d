//! # Configuration
//!
//! - `readiness`: resolution and polling settings from environment variables
//! - `properties`: ambient test properties used for placeholder expansion

pub mod properties;
pub mod readiness;

pub use properties::{PropertiesError, TestProperties};
pub use readiness::ReadinessConfig;
