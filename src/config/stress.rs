//! Stress run configuration module.
//!
//! Defaults for the `stress` subcommand, which hammers a trie from several
//! threads with disjoint keys.

use super::{ConfigResult, Validate};
use crate::error::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Stress run configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StressConfig {
    /// Number of writer threads
    pub threads: usize,

    /// Number of keys each thread inserts
    pub keys_per_thread: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
            keys_per_thread: 1000,
        }
    }
}

impl Validate for StressConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.threads == 0 {
            return Err(ConfigError::ValidationError(
                "stress.threads must be greater than 0".to_string(),
            ));
        }

        if self.keys_per_thread == 0 {
            return Err(ConfigError::ValidationError(
                "stress.keys_per_thread must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
