//! # Test Properties
//!
//! Ambient test configuration used to expand placeholders in service names.
//!
//! Lookup order for a key such as `app.name`:
//! 1. values inserted explicitly or loaded from files
//! 2. the process environment under the literal key (`app.name`)
//! 3. the process environment under the upper-snake-case key (`APP_NAME`)

use serde_yaml::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PropertiesError {
    #[error("Failed to read properties file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid YAML properties: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("YAML properties document must be a mapping at the top level")]
    NotAMapping,
    #[error("Invalid env properties file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Key/value configuration visible to placeholder expansion
#[derive(Debug, Clone)]
pub struct TestProperties {
    values: HashMap<String, String>,
    use_environment: bool,
}

impl Default for TestProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProperties {
    /// Properties backed by explicit values and the process environment
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            use_environment: true,
        }
    }

    /// Properties backed only by explicit values
    #[must_use]
    pub fn isolated() -> Self {
        Self {
            values: HashMap::new(),
            use_environment: false,
        }
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Look up a property value
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.values.get(key) {
            return Some(value.clone());
        }
        if !self.use_environment {
            return None;
        }
        std::env::var(key)
            .ok()
            .or_else(|| std::env::var(env_key(key)).ok())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Load a YAML document, flattening nested mappings into dotted keys
    ///
    /// `app: { name: greeting }` becomes `app.name = greeting`. Sequence items
    /// are addressed by index (`hosts.0`). Null values are skipped.
    ///
    /// Returns the number of properties loaded.
    pub fn load_yaml_str(&mut self, yaml: &str) -> Result<usize, PropertiesError> {
        let document: Value = serde_yaml::from_str(yaml)?;
        let Value::Mapping(_) = &document else {
            return Err(PropertiesError::NotAMapping);
        };
        let mut flattened = Vec::new();
        flatten_yaml("", &document, &mut flattened);
        let count = flattened.len();
        self.values.extend(flattened);
        Ok(count)
    }

    /// Load a YAML properties file
    pub fn load_yaml_file(&mut self, path: &Path) -> Result<usize, PropertiesError> {
        let contents = std::fs::read_to_string(path).map_err(|source| PropertiesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let count = self.load_yaml_str(&contents)?;
        debug!("Loaded {} properties from {}", count, path.display());
        Ok(count)
    }

    /// Load a dotenv-style file (`KEY=value` lines)
    ///
    /// Values are stored without touching the process environment.
    pub fn load_env_file(&mut self, path: &Path) -> Result<usize, PropertiesError> {
        let to_error = |source| PropertiesError::EnvFile {
            path: path.to_path_buf(),
            source,
        };
        let mut count = 0;
        for item in dotenvy::from_path_iter(path).map_err(to_error)? {
            let (key, value) = item.map_err(to_error)?;
            self.values.insert(key, value);
            count += 1;
        }
        debug!("Loaded {} properties from {}", count, path.display());
        Ok(count)
    }
}

/// Environment variable name for a dotted property key
///
/// `app.name` → `APP_NAME`, `route-host` → `ROUTE_HOST`
pub fn env_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn flatten_yaml(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                let key = match key {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => continue,
                };
                flatten_yaml(&join(&key), child, out);
            }
        }
        Value::Sequence(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_yaml(&join(&index.to_string()), child, out);
            }
        }
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        Value::Number(n) => out.push((prefix.to_string(), n.to_string())),
        Value::Bool(b) => out.push((prefix.to_string(), b.to_string())),
        Value::Tagged(tagged) => flatten_yaml(prefix, &tagged.value, out),
        Value::Null => {}
    }
}
