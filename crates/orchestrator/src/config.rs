//! Configuration parsing and validation for spray runs

use serde::{Deserialize, Serialize};
use spray_kernel::SprayParams;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// A named simulation run as stored in `configs/*.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprayConfig {
    /// Human-readable run name
    pub name: String,
    /// Free-form notes
    #[serde(default)]
    pub description: Option<String>,
    /// Kernel parameters; omitted fields take their defaults
    #[serde(default)]
    pub simulation: SprayParams,
    /// Frame materialization and output location
    #[serde(default)]
    pub output: OutputConfig,
}

/// Which steps are written out, and where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Materialize every Nth step; overrides `max_saved_frames`
    #[serde(default)]
    pub save_every: Option<usize>,
    /// Frame budget used to derive the stride when `save_every` is unset
    #[serde(default = "default_max_saved_frames")]
    pub max_saved_frames: usize,
    /// Directory for PNG frames and the manifest
    #[serde(default = "default_directory")]
    pub directory: String,
}

// Default values
fn default_max_saved_frames() -> usize {
    100
}

fn default_directory() -> String {
    "outputs".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_every: None,
            max_saved_frames: default_max_saved_frames(),
            directory: default_directory(),
        }
    }
}

impl SprayConfig {
    /// Load and validate a configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = Self::from_json(&contents)?;
        tracing::debug!("Loaded config '{}' from {:?}", config.name, path);
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SprayConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Invalid("name must not be empty".to_string()));
        }

        if self.output.save_every == Some(0) {
            return Err(Error::Invalid("output.save_every must be at least 1".to_string()));
        }
        if self.output.save_every.is_none() && self.output.max_saved_frames == 0 {
            return Err(Error::Invalid(
                "output.max_saved_frames must be at least 1".to_string(),
            ));
        }

        self.simulation.validate()?;
        Ok(())
    }

    /// Kernel parameters for this run
    pub fn to_params(&self) -> SprayParams {
        self.simulation.clone()
    }
}
