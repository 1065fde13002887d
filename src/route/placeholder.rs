//! # Placeholder Expansion
//!
//! Expands `${key}` and `${key:default}` tokens against [`TestProperties`].

use crate::config::TestProperties;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]*)\}")
        .expect("Failed to compile placeholder pattern - this should never happen")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
    #[error("placeholder '${{{0}}}' has no value in the test configuration")]
    Unresolved(String),
    #[error("placeholder with an empty key")]
    EmptyKey,
    #[error("unterminated placeholder")]
    Unterminated,
    #[error("placeholder '${{{0}}}' nests another placeholder, which is not supported")]
    Nested(String),
}

/// Returns true when the template contains at least one placeholder token
pub fn is_templated(template: &str) -> bool {
    template.contains("${")
}

/// Expand every placeholder in `template`
///
/// Literal text around placeholders is kept (`${app.name}-web` → `greeting-web`).
/// A default after the first `:` is used when the key has no value. Defaults
/// and property values may not themselves contain placeholders.
pub fn expand(template: &str, properties: &TestProperties) -> Result<String, PlaceholderError> {
    if PLACEHOLDER.replace_all(template, "").contains("${") {
        return Err(PlaceholderError::Unterminated);
    }

    let mut expanded = String::with_capacity(template.len());
    let mut last = 0;
    for captures in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        expanded.push_str(&template[last..whole.start()]);

        let (key, default) = match inner.as_str().split_once(':') {
            Some((key, default)) => (key.trim(), Some(default)),
            None => (inner.as_str().trim(), None),
        };
        if key.is_empty() {
            return Err(PlaceholderError::EmptyKey);
        }
        if default.is_some_and(is_templated) {
            return Err(PlaceholderError::Nested(key.to_string()));
        }

        let value = properties
            .get(key)
            .or_else(|| default.map(str::to_string))
            .ok_or_else(|| PlaceholderError::Unresolved(key.to_string()))?;
        if is_templated(&value) {
            return Err(PlaceholderError::Nested(key.to_string()));
        }
        expanded.push_str(&value);
        last = whole.end();
    }
    expanded.push_str(&template[last..]);

    Ok(expanded)
}
