//! Key-value configuration lookup.
//!
//! The host decides where values come from (process environment, a build-time
//! table, a remote config service). Checks only ever ask for a named value.

use std::collections::HashMap;

/// Opaque named string values.
pub trait Settings: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads values from the process environment, optionally prefixed.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings {
    prefix: String,
}

impl EnvSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `{prefix}{key}` instead of `key`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Settings for EnvSettings {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(format!("{}{}", self.prefix, key)).ok()
    }
}

/// An in-memory table of values.
#[derive(Debug, Clone, Default)]
pub struct MapSettings {
    values: HashMap<String, String>,
}

impl MapSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl Settings for MapSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Return the value only when it is meaningfully set.
///
/// Empty strings and the literal `"undefined"` (what unset build-time
/// variables render as) count as absent.
pub fn configured(settings: &dyn Settings, key: &str) -> Option<String> {
    settings
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "undefined")
}
