//! # Fixture Slots

use std::fmt;
use url::Url;

/// Declared type of a fixture slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotType {
    /// Absolute URL; the only type a route can be injected into
    Url,
    /// Plain text field
    Text,
    /// Any other declared type, by name
    Other(String),
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotType::Url => f.write_str("url"),
            SlotType::Text => f.write_str("text"),
            SlotType::Other(name) => f.write_str(name),
        }
    }
}

/// Named field on a test fixture that receives a route URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSlot {
    name: String,
    declared: SlotType,
    value: Option<Url>,
}

impl FixtureSlot {
    pub fn new(name: impl Into<String>, declared: SlotType) -> Self {
        Self {
            name: name.into(),
            declared,
            value: None,
        }
    }

    /// Empty URL-typed slot
    pub fn url(name: impl Into<String>) -> Self {
        Self::new(name, SlotType::Url)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared(&self) -> &SlotType {
        &self.declared
    }

    /// Injected URL, `None` until a route has been bound
    pub fn value(&self) -> Option<&Url> {
        self.value.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.value.is_some()
    }

    pub(crate) fn bind(&mut self, url: Url) {
        self.value = Some(url);
    }
}
