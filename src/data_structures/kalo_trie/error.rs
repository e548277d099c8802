//! Error types for the Kalo Trie.
//!
//! Every failure is local and recoverable; the trie stays usable after any
//! rejected call.

/// Errors that can occur in Kalo Trie operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KaloTrieError {
    /// Error when an empty key is provided.
    #[error("Empty key not allowed")]
    EmptyKey,

    /// Error when the key is not stored in the trie.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Error when inserting a key that already holds a value.
    #[error("Key already has a value: {0}")]
    DuplicateKey(String),

    /// Error when a node latch could not be acquired without blocking.
    #[error("Node latch unavailable while looking up key: {0}")]
    LockUnavailable(String),

    /// Error when a key exceeds the configured maximum length.
    #[error("Key '{key}' exceeds maximum key length of {max_length}")]
    KeyTooLong {
        /// The key that was too long.
        key: String,
        /// The maximum allowed length in characters.
        max_length: usize,
    },
}
