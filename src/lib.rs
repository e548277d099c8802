//! Kalo Library
//!
//! A concurrent, typed prefix trie plus the configuration, error and logging
//! plumbing used by the `kalo` binary.
//!
//! # Example
//!
//! ```
//! use kalo_lib::data_structures::KaloTrie;
//!
//! let trie = KaloTrie::new();
//! assert!(trie.insert("foo", 1));
//! assert!(trie.insert("foobar", 2));
//! assert_eq!(trie.lookup_maybe("foo"), Some(1));
//! assert_eq!(trie.lookup_maybe("foob"), None);
//! ```

pub mod cli;
pub mod config;
pub mod data_structures;
pub mod error;

// Internal modules that are not part of the public API
#[cfg(test)]
pub(crate) mod tests;

/// Version information for Kalo.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library initialization function.
///
/// Installs the tracing error reporter and returns the configuration loaded
/// from `config_path` (or defaults) with `KALO__*` environment overrides.
pub fn init(config_path: Option<&std::path::Path>) -> error::KaloResult<config::KaloConfig> {
    error::set_error_reporter(std::sync::Arc::new(error::TracingErrorReporter));

    let loaded = config::ConfigLoader::new(config_path, config::ENV_PREFIX).load()?;
    Ok(loaded)
}
