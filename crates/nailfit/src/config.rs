//! Pipeline configuration.
//!
//! Physical constants (reference size, print DPI) live here rather than in
//! session input. Every section has defaults, so a config file only needs the
//! values it changes.

use std::path::Path;

use thiserror::Error;

use crate::calibration::ReferenceObjectSpec;
use crate::compositor::CompositorConfig;
use crate::design::{GenerationServiceConfig, RateLimitPolicy, StylePreferences};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub reference: ReferenceObjectSpec,
    pub compositor: CompositorConfig,
    pub rate_limit: RateLimitPolicy,
    pub generation: GenerationServiceConfig,
    /// Style used when a session does not bring its own.
    pub style: StylePreferences,
}

impl PipelineConfig {
    /// Load and validate a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reference.validate().map_err(ConfigError::Invalid)?;
        self.compositor.validate().map_err(ConfigError::Invalid)?;
        self.generation.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}
