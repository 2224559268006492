//! Engine configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound accepted for `max_depth`. Deeper nesting risks exhausting the
/// thread stack before the depth guard trips.
pub const MAX_DEPTH_LIMIT: usize = 1024;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of evaluation path segments before a child is treated
    /// as indeterminate. Bounds recursion through cyclic catalog references.
    pub max_depth: usize,

    /// Separator placed between path segments in event path ids
    pub path_separator: String,

    /// Record child outcomes during evaluation so child actions run with the
    /// outcome their policy produced. When disabled, children are re-evaluated
    /// (through the decision cache) when their actions run.
    pub record_child_outcomes: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 128,
            path_separator: "/".into(),
            record_child_outcomes: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be > 0".into()));
        }
        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_depth must be <= {MAX_DEPTH_LIMIT}, got {}",
                self.max_depth
            )));
        }
        if self.path_separator.is_empty() {
            return Err(ConfigError::Invalid("path_separator must not be empty".into()));
        }
        Ok(())
    }
}
