//! Crate-internal test suites for Kalo.
//!
//! - Trie behaviour, including property-based tests using proptest
//! - Configuration loading and validation
//! - Error display and reporting
//!
//! Concurrency tests that only need the public API live in `tests/`.

pub mod error_tests;
pub mod trie_tests;
