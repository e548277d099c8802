//! Trie configuration module.
//!
//! This module defines the settings applied to every trie the binary builds.

use super::{ConfigResult, Validate};
use crate::data_structures::kalo_trie::{KaloTrieConfig, DEFAULT_MAX_KEY_LENGTH};
use crate::error::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Hard ceiling for `max_key_length`.
pub const MAX_KEY_LENGTH_CEILING: usize = 64 * 1024;

/// Trie configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrieSettings {
    /// Maximum key length in characters (0 disables the bound)
    pub max_key_length: usize,
}

impl Default for TrieSettings {
    fn default() -> Self {
        Self {
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
        }
    }
}

impl Validate for TrieSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_key_length > MAX_KEY_LENGTH_CEILING {
            return Err(ConfigError::ValueOutOfRange {
                key: "trie.max_key_length".to_string(),
                message: format!("must be at most {MAX_KEY_LENGTH_CEILING}"),
            });
        }
        Ok(())
    }
}

impl From<&TrieSettings> for KaloTrieConfig {
    fn from(settings: &TrieSettings) -> Self {
        Self {
            max_key_length: settings.max_key_length,
        }
    }
}
