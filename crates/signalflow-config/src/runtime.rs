//! Runtime settings file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use signalflow_core::{DEFAULT_ALIGNMENT, FlowConfig};

use crate::error::ConfigError;
use crate::validation::{self, MAX_SAMPLE_RATE, ValidationError, ValidationResult};

fn default_period() -> usize {
    64
}

fn default_sample_rate() -> u32 {
    48_000
}

fn default_alignment() -> usize {
    DEFAULT_ALIGNMENT
}

/// Block-level settings of a signal flow, as stored on disk.
///
/// Missing keys take their defaults, so an empty file is a valid
/// configuration.
///
/// ```toml
/// period = 64
/// sample_rate = 48000
/// alignment = 32
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Block length in samples.
    #[serde(default = "default_period")]
    pub period: usize,

    /// Sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Row alignment of the communication area in bytes.
    #[serde(default = "default_alignment")]
    pub alignment: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            sample_rate: default_sample_rate(),
            alignment: default_alignment(),
        }
    }
}

impl RuntimeConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Set the block length.
    pub fn with_period(mut self, period: usize) -> Self {
        self.period = period;
        self
    }

    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the row alignment.
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Check every setting, reporting all problems at once.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();
        if self.period == 0 {
            errors.push(ValidationError::ZeroPeriod);
        }
        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            errors.push(ValidationError::InvalidSampleRate(self.sample_rate));
        }
        if !self.alignment.is_power_of_two() {
            errors.push(ValidationError::InvalidAlignment(self.alignment));
        }
        validation::collect(errors)
    }

    /// Validated settings for [`SignalFlow::new`](signalflow_core::SignalFlow::new).
    pub fn flow_config(&self) -> Result<FlowConfig, ConfigError> {
        self.validate()?;
        Ok(FlowConfig::new(self.period, self.sample_rate as f32).with_alignment(self.alignment))
    }
}
