//! Tests for the Kalo Trie.
//!
//! Covers insert/lookup/remove semantics, orphan pruning, printing and a
//! model-based property test against `BTreeMap`.

use std::collections::BTreeMap;

use proptest::prelude::*;
use test_case::test_case;

use super::test_utils::{key_strategy, sample_trie, SAMPLE_KEYS};
use crate::config::trie::MAX_KEY_LENGTH_CEILING;
use crate::data_structures::kalo_trie::{KaloTrie, KaloTrieConfig, KaloTrieError};

/// Runs `f` on a thread with the default test-thread stack size.
fn on_small_stack<F: FnOnce() + Send + 'static>(f: F) {
    std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap();
}

#[test]
fn test_duplicate_insert_keeps_first_value() {
    let trie = KaloTrie::new();
    assert!(trie.insert("key", "v1"));
    assert_eq!(
        trie.try_insert("key", "v2"),
        Err(KaloTrieError::DuplicateKey("key".to_string()))
    );
    assert_eq!(trie.lookup_maybe("key"), Some("v1"));
}

#[test]
fn test_prefix_keys_are_independent() {
    let trie = sample_trie();
    assert_eq!(trie.lookup_maybe("foo"), Some(1));
    assert_eq!(trie.lookup_maybe("foobar"), Some(4));
    assert_eq!(trie.lookup_maybe("fooba"), None);
    assert_eq!(trie.lookup_maybe("foob"), None);
    assert!(!trie.contains("fo"));
}

#[test_case("foo" ; "shorter stored key")]
#[test_case("foobar" ; "longer stored key")]
#[test_case("bar" ; "sibling key")]
fn test_remove_then_lookup_fails(key: &str) {
    let trie = sample_trie();
    assert!(trie.remove(key));
    assert!(!trie.lookup(key, None));

    for (other, value) in SAMPLE_KEYS.iter().filter(|(k, _)| *k != key) {
        assert_eq!(trie.lookup_maybe(other), Some(*value), "{other} lost after removing {key}");
    }
}

#[test]
fn test_orphan_pruning_leaves_only_root() {
    let trie = KaloTrie::new();
    assert!(trie.insert("foobar", 1));
    assert!(trie.remove("foobar"));

    assert!(trie.is_empty());
    assert_eq!(trie.to_string(), "\\0\n");

    // No stale value resurfaces on the old path.
    assert!(trie.insert("foo", 2));
    assert_eq!(trie.lookup_maybe("foo"), Some(2));
    assert_eq!(trie.lookup_maybe("foobar"), None);
}

#[test]
fn test_shared_prefix_survives_removal() {
    let trie = KaloTrie::new();
    assert!(trie.insert("foo", 1));
    assert!(trie.insert("foobar", 2));
    assert!(trie.remove("foobar"));

    assert_eq!(trie.lookup_maybe("foo"), Some(1));
    assert_eq!(trie.to_string(), "\\0\n f\n  o\n   o : 1\n");
}

#[test]
fn test_removing_stored_prefix_demotes_it() {
    let trie = KaloTrie::new();
    assert!(trie.insert("foo", 1));
    assert!(trie.insert("foobar", 2));
    assert_eq!(trie.try_remove("foo"), Ok(1));

    assert_eq!(trie.lookup_maybe("foobar"), Some(2));
    assert_eq!(trie.to_string(), "\\0\n f\n  o\n   o\n    b\n     a\n      r : 2\n");
}

#[test_case("foob" ; "structural only path")]
#[test_case("fo" ; "structural prefix of stored key")]
#[test_case("foobarbaz" ; "extends past a leaf")]
#[test_case("qux" ; "missing first character")]
fn test_remove_of_unstored_key_fails_without_mutation(key: &str) {
    let trie = sample_trie();
    let before = trie.to_string();

    assert_eq!(
        trie.try_remove(key),
        Err(KaloTrieError::KeyNotFound(key.to_string()))
    );
    assert_eq!(trie.to_string(), before);
    assert_eq!(trie.len(), SAMPLE_KEYS.len());
}

#[test]
fn test_empty_key_is_rejected_everywhere() {
    let trie = sample_trie();
    let before = trie.to_string();

    assert_eq!(trie.try_insert("", 0), Err(KaloTrieError::EmptyKey));
    assert_eq!(trie.try_remove(""), Err(KaloTrieError::EmptyKey));
    assert_eq!(trie.get(""), Err(KaloTrieError::EmptyKey));
    assert!(!trie.insert("", 0));
    assert!(!trie.remove(""));
    assert!(!trie.lookup("", None));
    assert!(!trie.contains(""));
    assert_eq!(trie.to_string(), before);
}

#[test]
fn test_lookup_leaves_output_untouched_on_miss() {
    let trie = sample_trie();
    let mut out = -1;
    assert!(!trie.lookup("nope", Some(&mut out)));
    assert_eq!(out, -1);
    assert!(trie.lookup("baz", Some(&mut out)));
    assert_eq!(out, 3);
}

#[test]
fn test_find_by_prefix_is_sorted() {
    let trie = sample_trie();
    assert_eq!(
        trie.find_by_prefix("fo"),
        vec![("foo".to_string(), 1), ("foobar".to_string(), 4)]
    );
    assert_eq!(trie.find_by_prefix("ba").len(), 2);
    assert!(trie.find_by_prefix("x").is_empty());
    assert_eq!(trie.keys(), vec!["bar", "baz", "foo", "foobar"]);
}

#[test]
fn test_print_renders_whole_tree() {
    let trie = sample_trie();
    let mut out = Vec::new();
    trie.print(&mut out).unwrap();
    let expected = "\\0\n b\n  a\n   r : 2\n   z : 3\n f\n  o\n   o : 1\n    b\n     a\n      r : 4\n";
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[test]
fn test_multibyte_keys() {
    let trie = KaloTrie::new();
    assert!(trie.insert("héllo", 1));
    assert!(trie.insert("hé", 2));
    assert_eq!(trie.lookup_maybe("héllo"), Some(1));
    assert!(trie.remove("héllo"));
    assert_eq!(trie.keys(), vec!["hé"]);
}

#[test]
fn test_longest_accepted_key_inserts_and_removes() {
    on_small_stack(|| {
        let key = "a".repeat(MAX_KEY_LENGTH_CEILING);
        let trie = KaloTrie::with_config(KaloTrieConfig {
            max_key_length: MAX_KEY_LENGTH_CEILING,
        });
        assert!(trie.insert(&key, 1));
        assert!(trie.insert(&key[..10], 2));
        assert_eq!(trie.len(), 2);
        assert_eq!(trie.lookup_latched(&key), Ok(Some(1)));

        assert_eq!(trie.try_remove(&key), Ok(1));
        assert_eq!(trie.to_string().lines().count(), 11);
        assert_eq!(trie.keys(), vec!["a".repeat(10)]);
    });
}

#[test]
fn test_unbounded_deep_key_survives_walks_and_drop() {
    on_small_stack(|| {
        let key = "ab".repeat(MAX_KEY_LENGTH_CEILING);
        let trie = KaloTrie::with_config(KaloTrieConfig { max_key_length: 0 });
        assert!(trie.insert(&key, 7u8));
        assert!(trie.insert("b", 8));

        assert_eq!(trie.len(), 2);
        assert_eq!(trie.find_by_prefix("abab"), vec![(key.clone(), 7)]);
        drop(trie);
    });
}

/// Counts rendered lines without keeping the indentation around.
#[derive(Default)]
struct LineCounter(usize);

impl std::io::Write for LineCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0 += buf.iter().filter(|&&b| b == b'\n').count();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_print_of_deep_path() {
    on_small_stack(|| {
        let depth = 20_000;
        let trie = KaloTrie::with_config(KaloTrieConfig { max_key_length: 0 });
        assert!(trie.insert(&"x".repeat(depth), 1));

        let mut lines = LineCounter::default();
        trie.print(&mut lines).unwrap();
        assert_eq!(lines.0, depth + 1);
    });
}

#[test]
fn test_clear_releases_deep_paths() {
    on_small_stack(|| {
        let trie = KaloTrie::with_config(KaloTrieConfig { max_key_length: 0 });
        assert!(trie.insert(&"z".repeat(MAX_KEY_LENGTH_CEILING), ()));
        trie.clear();
        assert!(trie.is_empty());
    });
}

#[derive(Debug, Clone)]
enum Op {
    Insert(String, u32),
    Remove(String),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (key_strategy(5), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        key_strategy(5).prop_map(Op::Remove),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_insert_then_lookup_round_trips(key in key_strategy(12), value in any::<u32>()) {
        let trie = KaloTrie::new();
        prop_assert!(trie.insert(&key, value));
        prop_assert_eq!(trie.lookup_maybe(&key), Some(value));
    }

    #[test]
    fn prop_matches_btreemap_model(ops in proptest::collection::vec(op_strategy(), 1..64)) {
        let trie = KaloTrie::new();
        let mut model = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let fresh = !model.contains_key(&key);
                    if fresh {
                        model.insert(key.clone(), value);
                    }
                    prop_assert_eq!(trie.insert(&key, value), fresh);
                }
                Op::Remove(key) => {
                    prop_assert_eq!(trie.try_remove(&key).ok(), model.remove(&key));
                }
            }
        }

        let expected: Vec<(String, u32)> = model.into_iter().collect();
        prop_assert_eq!(trie.len(), expected.len());
        prop_assert_eq!(trie.find_by_prefix(""), expected.clone());
        prop_assert_eq!(trie.is_empty(), expected.is_empty());

        // Pruning leaves exactly the nodes on stored paths.
        let mut paths = std::collections::BTreeSet::new();
        for (key, _) in &expected {
            let chars: Vec<char> = key.chars().collect();
            for end in 1..=chars.len() {
                paths.insert(chars[..end].iter().collect::<String>());
            }
        }
        let rendered_nodes = trie.to_string().lines().count();
        prop_assert_eq!(rendered_nodes, paths.len() + 1);
    }
}
