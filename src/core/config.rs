//! Tunable constants for the preheat scheduler and output annotation
//!
//! Defaults match the values the tool has always shipped with. A TOML file
//! may override any subset of them.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::error::{Result, WizardError};

/// Configuration for a single post-processing run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    /// Seconds before a tool's next use at which its heater is brought up
    ///
    /// Larger values heat earlier and waste more standby energy; smaller
    /// values risk the tool change waiting on the heater.
    pub preheat_horizon: f64,

    /// Degrees below the target temperature held while a tool idles
    ///
    /// A tool that will be needed again later is dropped to
    /// `target - idle_offset` rather than switched off, so reheating is short.
    pub idle_offset: f64,

    /// Comment text appended to every synthesized line
    pub annotation: String,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            preheat_horizon: 9.0,
            idle_offset: 65.0,
            annotation: "inserted by tool-wizard".to_string(),
        }
    }
}

impl WizardConfig {
    /// Parse a config from TOML text, keeping defaults for missing keys
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: WizardConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| WizardError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(?path, ?config, "Loaded configuration");
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if !self.preheat_horizon.is_finite() || self.preheat_horizon < 0.0 {
            return Err(WizardError::InvalidConfig(format!(
                "preheat_horizon ({}) must be a finite, non-negative number of seconds",
                self.preheat_horizon
            )));
        }

        if !self.idle_offset.is_finite() || self.idle_offset < 0.0 {
            return Err(WizardError::InvalidConfig(format!(
                "idle_offset ({}) must be a finite, non-negative number of degrees",
                self.idle_offset
            )));
        }

        if self.annotation.contains(['\n', '\r']) {
            return Err(WizardError::InvalidConfig(
                "annotation must fit on a single line".into(),
            ));
        }

        Ok(())
    }
}
