//! Kalo Trie Implementation
//!
//! A concurrent, mutable prefix tree mapping string keys to values of one
//! payload type, with exact and prefix lookups.
//!
//! # Locking
//!
//! A single trie-wide reader/writer lock gates every public call: inserts and
//! removals take it exclusively for their whole duration, lookups and prints
//! take it shared. Operations are therefore linearizable and never observe a
//! partial mutation.
//!
//! Each node additionally carries a latch that is only ever *tried*, never
//! waited on. [`KaloTrie::lookup_latched`] walks the path hand-over-hand on
//! those latches under the shared trie lock. No trie operation takes a latch
//! exclusively, so [`KaloTrieError::LockUnavailable`] only shows up while a
//! [`NodeGuard::write`] is held on a node of the path.
//!
//! # Node layout
//!
//! Nodes are either navigators (pure path) or value nodes (terminal). Insert
//! promotes the terminal navigator in place; remove demotes the terminal node
//! and prunes every ancestor left with neither a value nor children, up to
//! but never including the root.

mod error;
mod node;

use std::fmt::{self, Display};
use std::io::{self, Write};

use parking_lot::RwLock;
use tracing::{debug, trace};

pub use error::KaloTrieError;
pub use node::{NodeGuard, NodeSlot, TrieNode, ROOT_KEY};

/// Result type for Kalo Trie operations
pub type KaloTrieResult<T> = Result<T, KaloTrieError>;

/// Default upper bound on key length, in characters.
pub const DEFAULT_MAX_KEY_LENGTH: usize = 1024;

/// Configuration options for the Kalo Trie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KaloTrieConfig {
    /// Maximum key length in characters accepted by insert (0 disables the
    /// bound). No operation recurses along a key, so the bound only limits
    /// memory per key.
    pub max_key_length: usize,
}

impl Default for KaloTrieConfig {
    fn default() -> Self {
        Self {
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
        }
    }
}

/// Concurrent prefix tree keyed by character sequences.
///
/// # Type Parameters
///
/// * `T` - Payload stored under each key.
#[derive(Debug)]
pub struct KaloTrie<T> {
    /// Sentinel root; always a navigator, never pruned or replaced
    root: RwLock<TrieNode<T>>,

    /// Configuration options
    config: KaloTrieConfig,
}

impl<T> KaloTrie<T> {
    /// Creates a new empty `KaloTrie` with default configuration.
    pub fn new() -> Self {
        Self::with_config(KaloTrieConfig::default())
    }

    /// Creates a new empty `KaloTrie` with the specified configuration.
    pub fn with_config(config: KaloTrieConfig) -> Self {
        Self {
            root: RwLock::new(TrieNode::root()),
            config,
        }
    }

    /// Returns the configuration of this trie.
    pub fn config(&self) -> &KaloTrieConfig {
        &self.config
    }

    /// Inserts `value` under `key`.
    ///
    /// # Returns
    ///
    /// `true` if the key was stored, `false` if the key is empty, too long, or
    /// already holds a value (which is left untouched).
    pub fn insert(&self, key: &str, value: T) -> bool {
        self.try_insert(key, value).is_ok()
    }

    /// Inserts `value` under `key`, reporting why a rejected insert failed.
    ///
    /// Missing path characters are created as navigators; the terminal node
    /// is promoted in place so that nodes of longer keys stay attached.
    ///
    /// # Errors
    ///
    /// * `EmptyKey` - `key` is empty.
    /// * `KeyTooLong` - `key` exceeds `max_key_length`.
    /// * `DuplicateKey` - the terminal node already holds a value.
    pub fn try_insert(&self, key: &str, value: T) -> KaloTrieResult<()> {
        self.check_insert_key(key)?;

        let mut root = self.root.write();
        let mut node: &mut TrieNode<T> = &mut root;
        for c in key.chars() {
            node = node.child_or_insert_navigator(c);
        }

        node.promote(value).map_err(|_| {
            debug!(key = %key, "insert rejected, key already has a value");
            KaloTrieError::DuplicateKey(key.to_string())
        })?;

        trace!(key = %key, "inserted");
        Ok(())
    }

    /// Removes `key` and prunes the nodes it leaves orphaned.
    ///
    /// # Returns
    ///
    /// `true` if a stored value was removed. Empty keys, missing paths and
    /// paths that exist only as a prefix of longer keys yield `false` and
    /// leave the trie unchanged.
    pub fn remove(&self, key: &str) -> bool {
        self.try_remove(key).is_ok()
    }

    /// Removes `key`, returning the value it held.
    ///
    /// # Errors
    ///
    /// * `EmptyKey` - `key` is empty.
    /// * `KeyNotFound` - some character of `key` has no node, or the terminal
    ///   node holds no value.
    pub fn try_remove(&self, key: &str) -> KaloTrieResult<T> {
        if key.is_empty() {
            return Err(KaloTrieError::EmptyKey);
        }

        let chars: Vec<char> = key.chars().collect();
        if self.exceeds_max_length(chars.len()) {
            // Never insertable, so never stored.
            return Err(KaloTrieError::KeyNotFound(key.to_string()));
        }

        let mut root = self.root.write();
        let Some(cut) = Self::prune_depth(&root, &chars) else {
            debug!(key = %key, "remove rejected, key not stored");
            return Err(KaloTrieError::KeyNotFound(key.to_string()));
        };

        let value = Self::descend_mut(&mut root, &chars)
            .and_then(TrieNode::demote)
            .ok_or_else(|| KaloTrieError::KeyNotFound(key.to_string()))?;

        if let Some(cut) = cut {
            // Erasing the topmost orphan drops the whole chain beneath it.
            if let Some(parent) = Self::descend_mut(&mut root, &chars[..cut]) {
                trace!(key = %chars[cut].escape_debug(), depth = cut, "pruning orphaned nodes");
                parent.remove_key(chars[cut]);
            }
        }

        trace!(key = %key, "removed");
        Ok(value)
    }

    /// Plans the removal of `path` without touching the tree.
    ///
    /// # Returns
    ///
    /// * `None` - `path` is not stored.
    /// * `Some(None)` - the terminal node keeps children, so only its value
    ///   goes.
    /// * `Some(Some(i))` - once the terminal is demoted, the nodes for
    ///   `path[i..]` are all orphaned and `path[i]` is erased from its
    ///   parent. The root is never part of that range.
    fn prune_depth(root: &TrieNode<T>, path: &[char]) -> Option<Option<usize>> {
        let mut cut = 0;
        let mut node = root;
        for (depth, &c) in path.iter().enumerate() {
            node = node.child(c)?;
            let terminal = depth + 1 == path.len();
            if !terminal && (node.has_value() || node.child_count() > 1) {
                cut = depth + 1;
            }
        }

        if !node.has_value() {
            return None;
        }
        Some((!node.has_any_child()).then_some(cut))
    }

    // NOT LOCKED: callers hold the trie write lock.
    fn descend_mut<'a>(root: &'a mut TrieNode<T>, path: &[char]) -> Option<&'a mut TrieNode<T>> {
        path.iter().try_fold(root, |node, &c| node.child_mut(c))
    }

    /// Looks up `key`, copying its value into `out` when one is given.
    ///
    /// # Returns
    ///
    /// `true` if `key` is stored. With `out` set to `None` this is a pure
    /// existence check.
    pub fn lookup(&self, key: &str, out: Option<&mut T>) -> bool
    where
        T: Clone,
    {
        match self.lookup_maybe(key) {
            Some(value) => {
                if let Some(slot) = out {
                    *slot = value;
                }
                true
            }
            None => false,
        }
    }

    /// Returns the value stored under `key`, or `None`.
    pub fn lookup_maybe(&self, key: &str) -> Option<T>
    where
        T: Clone,
    {
        self.get(key).ok()
    }

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// * `EmptyKey` - `key` is empty.
    /// * `KeyNotFound` - the path is missing or only structural.
    pub fn get(&self, key: &str) -> KaloTrieResult<T>
    where
        T: Clone,
    {
        if key.is_empty() {
            return Err(KaloTrieError::EmptyKey);
        }

        let root = self.root.read();
        Self::traverse_down(&root, key)
            .and_then(TrieNode::value)
            .cloned()
            .ok_or_else(|| KaloTrieError::KeyNotFound(key.to_string()))
    }

    /// Returns `true` if `key` is stored.
    pub fn contains(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        let root = self.root.read();
        Self::traverse_down(&root, key).is_some_and(TrieNode::has_value)
    }

    /// Looks up `key` through the per-node latches.
    ///
    /// The trie-wide lock is taken in shared mode first, so this waits for a
    /// running insert or remove like [`get`](Self::get) does. The path is
    /// then walked hand-over-hand: the next node's latch is tried in shared
    /// mode before the current one is released, and a latch held exclusively
    /// fails the call instead of blocking.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(value))` - `key` is stored.
    /// * `Ok(None)` - `key` is not stored.
    /// * `Err(LockUnavailable)` - a latch on the path is held exclusively;
    ///   retry or give up, nothing can be concluded about the key.
    /// * `Err(EmptyKey)` - `key` is empty.
    pub fn lookup_latched(&self, key: &str) -> KaloTrieResult<Option<T>>
    where
        T: Clone,
    {
        if key.is_empty() {
            return Err(KaloTrieError::EmptyKey);
        }
        let unavailable = || KaloTrieError::LockUnavailable(key.to_string());

        let root = self.root.read();
        let mut guard = root.guard_read();
        for c in key.chars() {
            let node = guard.node().ok_or_else(unavailable)?;
            let next = match node.child_guard_read(c) {
                Some(next) => next,
                None => return Ok(None),
            };
            if !next.succeeded() {
                debug!(key = %key, "latched lookup backed off on a held latch");
                return Err(unavailable());
            }
            guard = next;
        }

        let node = guard.node().ok_or_else(unavailable)?;
        Ok(node.value().cloned())
    }

    /// Returns every stored key starting with `prefix`, sorted by key.
    ///
    /// An empty prefix returns all stored keys.
    pub fn find_by_prefix(&self, prefix: &str) -> Vec<(String, T)>
    where
        T: Clone,
    {
        let root = self.root.read();
        let mut result = Vec::new();
        if let Some(node) = Self::traverse_down(&root, prefix) {
            let mut path = prefix.to_string();
            node.collect_into(&mut path, &mut result);
        }
        result
    }

    /// Returns all stored keys in ascending order.
    pub fn keys(&self) -> Vec<String>
    where
        T: Clone,
    {
        self.find_by_prefix("")
            .into_iter()
            .map(|(key, _)| key)
            .collect()
    }

    /// Returns the number of stored keys.
    ///
    /// This walks the whole tree, so it is O(n) in the number of nodes.
    pub fn len(&self) -> usize {
        self.root.read().count_values()
    }

    /// Returns `true` if no key is stored.
    pub fn is_empty(&self) -> bool {
        !self.root.read().has_any_child()
    }

    /// Removes every key, leaving only the root.
    pub fn clear(&self) {
        let mut root = self.root.write();
        *root = TrieNode::root();
        debug!("trie cleared");
    }

    /// Writes the whole tree to `out`, one line per node.
    ///
    /// The shared lock is held for the whole traversal, so the output is a
    /// consistent snapshot.
    pub fn print<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()>
    where
        T: Display,
    {
        let root = self.root.read();
        root.print(out, 0)
    }

    fn check_insert_key(&self, key: &str) -> KaloTrieResult<()> {
        if key.is_empty() {
            return Err(KaloTrieError::EmptyKey);
        }
        if self.exceeds_max_length(key.chars().count()) {
            return Err(KaloTrieError::KeyTooLong {
                key: key.to_string(),
                max_length: self.config.max_key_length,
            });
        }
        Ok(())
    }

    fn exceeds_max_length(&self, len: usize) -> bool {
        self.config.max_key_length != 0 && len > self.config.max_key_length
    }

    // NOT LOCKED: callers hold the trie lock.
    fn traverse_down<'a>(root: &'a TrieNode<T>, key: &str) -> Option<&'a TrieNode<T>> {
        key.chars().try_fold(root, |node, c| node.child(c))
    }
}

impl<T> Default for KaloTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Display> Display for KaloTrie<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rendered = Vec::new();
        self.print(&mut rendered).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&rendered))
    }
}
