//! Data structures for Kalo.
//!
//! This module contains the concurrent trie and its node types. The trie is
//! safe to share across threads behind an `Arc`; every public operation
//! takes the trie-wide lock for its whole duration.

pub mod kalo_trie;

// Re-export common data structures
pub use kalo_trie::{KaloTrie, KaloTrieConfig, KaloTrieError, KaloTrieResult};
