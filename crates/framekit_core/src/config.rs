//! Framework configuration and per-bundle overrides.
//!
//! # Responsibility
//! - Deserialize framework settings from JSON.
//! - Supply per-bundle property overrides applied before `start`.
//!
//! # Invariants
//! - Missing fields fall back to defaults; unknown bundles have no overrides.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Collaborator interface looked up by the facade before starting a bundle.
pub trait ConfigSource {
    fn bundle_config(&self, bundle_id: &str) -> Option<Map<String, Value>>;
}

/// Framework settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Enables verbose lifecycle diagnostics.
    pub debug: bool,
    /// Log level for `init_logging_from_config`; `None` uses the default.
    pub log_level: Option<String>,
    /// Absolute log directory; `None` uses the host's fallback.
    pub log_dir: Option<String>,
    /// Per-bundle property overrides keyed by bundle id.
    pub bundles: BTreeMap<String, Map<String, Value>>,
}

impl FrameworkConfig {
    /// Parses a JSON settings document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Sets the override map for one bundle.
    pub fn with_bundle(mut self, bundle_id: impl Into<String>, config: Map<String, Value>) -> Self {
        self.bundles.insert(bundle_id.into(), config);
        self
    }
}

impl ConfigSource for FrameworkConfig {
    fn bundle_config(&self, bundle_id: &str) -> Option<Map<String, Value>> {
        self.bundles.get(bundle_id.trim()).cloned()
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid framework config: {message}"),
        }
    }
}

impl Error for ConfigError {}
