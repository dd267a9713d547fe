//! Runtime configuration files for signalflow.
//!
//! A [`RuntimeConfig`] holds the block-level settings of a signal flow
//! (period, sample rate, row alignment) and is stored as TOML:
//!
//! ```toml
//! period = 64          # block length in samples
//! sample_rate = 48000
//! alignment = 32       # bytes, power of two
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use signalflow_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::load("signalflow.toml")?;
//! let flow_config = config.flow_config()?;
//! assert_eq!(flow_config.block_length, config.period);
//!
//! config.with_period(128).save("signalflow.toml")?;
//! # Ok::<(), signalflow_config::ConfigError>(())
//! ```

mod error;
mod runtime;

/// Runtime configuration validation.
pub mod validation;

pub use error::ConfigError;
pub use runtime::RuntimeConfig;
pub use validation::{MAX_SAMPLE_RATE, ValidationError, ValidationResult};
