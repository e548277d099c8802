//! Node implementation for the Kalo Trie.
//!
//! A node stands for one character position in the key space. Its slot is
//! either a navigator, which only continues a path toward deeper keys, or a
//! value, which terminates a stored key and owns its payload. Every node owns
//! its children exclusively, so erasing a map entry drops the whole subtree.
//!
//! Key paths can be as deep as the longest stored key. Nothing here recurses
//! along that depth: subtree walks and drops keep their pending nodes on a
//! heap stack.

use std::fmt::{self, Debug, Display};
use std::io::{self, Write};

use fnv::FnvBuildHasher;
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Key of the root node. It never appears in a stored key path.
pub const ROOT_KEY: char = '\0';

/// Children of a node, keyed by the edge character.
pub type ChildMap<T> = HashMap<char, Box<TrieNode<T>>, FnvBuildHasher>;

/// Payload slot of a trie node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSlot<T> {
    /// Pure path node with no payload.
    Navigator,
    /// Terminal node carrying the value of a stored key.
    Value(T),
}

/// A node in the Kalo Trie.
pub struct TrieNode<T> {
    /// Edge label from the parent
    key: char,

    /// Exclusively owned children
    children: ChildMap<T>,

    /// Navigator or value payload
    slot: NodeSlot<T>,

    /// Latch for the fine-grained guard path; the trie-wide lock is what
    /// gates structural mutation.
    latch: RwLock<()>,
}

impl<T> TrieNode<T> {
    /// Creates a navigator node for `key`.
    pub fn navigator(key: char) -> Self {
        Self {
            key,
            children: ChildMap::default(),
            slot: NodeSlot::Navigator,
            latch: RwLock::new(()),
        }
    }

    /// Creates a value node for `key` holding `value`.
    pub fn with_value(key: char, value: T) -> Self {
        let mut node = Self::navigator(key);
        node.slot = NodeSlot::Value(value);
        node
    }

    /// Creates the sentinel root node.
    pub fn root() -> Self {
        Self::navigator(ROOT_KEY)
    }

    /// Returns the edge label of this node.
    #[inline]
    pub fn key(&self) -> char {
        self.key
    }

    /// Returns `true` only for value nodes.
    #[inline]
    pub fn has_value(&self) -> bool {
        matches!(self.slot, NodeSlot::Value(_))
    }

    /// Returns the stored value, if this is a value node.
    pub fn value(&self) -> Option<&T> {
        match &self.slot {
            NodeSlot::Value(value) => Some(value),
            NodeSlot::Navigator => None,
        }
    }

    /// Returns the payload slot.
    pub fn slot(&self) -> &NodeSlot<T> {
        &self.slot
    }

    #[inline]
    pub fn has_child(&self, key: char) -> bool {
        self.children.contains_key(&key)
    }

    #[inline]
    pub fn has_any_child(&self) -> bool {
        !self.children.is_empty()
    }

    /// Number of immediate children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns a reference to the child under `key`, if present.
    pub fn child(&self, key: char) -> Option<&TrieNode<T>> {
        self.children.get(&key).map(Box::as_ref)
    }

    /// Returns a mutable reference to the child under `key`, if present.
    pub fn child_mut(&mut self, key: char) -> Option<&mut TrieNode<T>> {
        self.children.get_mut(&key).map(Box::as_mut)
    }

    /// Inserts `child` under `key` if that slot is empty.
    ///
    /// # Returns
    ///
    /// * `Some(&mut TrieNode)` - The inserted child, now owned by this node.
    /// * `None` - The slot was occupied; the existing child is left untouched
    ///   and `child` is dropped.
    pub fn insert_key(&mut self, key: char, child: Box<TrieNode<T>>) -> Option<&mut TrieNode<T>> {
        debug_assert_eq!(key, child.key, "child key must match its edge label");
        match self.children.entry(key) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => Some(vacant.insert(child).as_mut()),
        }
    }

    /// Returns the child under `key`, creating a navigator if it is missing.
    pub fn child_or_insert_navigator(&mut self, key: char) -> &mut TrieNode<T> {
        self.children
            .entry(key)
            .or_insert_with(|| Box::new(TrieNode::navigator(key)))
            .as_mut()
    }

    /// Erases the child under `key` together with its subtree.
    ///
    /// Returns `false` if there was no such child.
    pub fn remove_key(&mut self, key: char) -> bool {
        self.children.remove(&key).is_some()
    }

    /// Turns a navigator into a value node in place, keeping key and children.
    ///
    /// Fails with the rejected value when the node already holds one.
    pub fn promote(&mut self, value: T) -> Result<(), T> {
        match self.slot {
            NodeSlot::Value(_) => Err(value),
            NodeSlot::Navigator => {
                self.slot = NodeSlot::Value(value);
                Ok(())
            }
        }
    }

    /// Turns a value node back into a navigator in place, keeping key and
    /// children. Returns the value it held, or `None` for a navigator.
    pub fn demote(&mut self) -> Option<T> {
        match std::mem::replace(&mut self.slot, NodeSlot::Navigator) {
            NodeSlot::Value(value) => Some(value),
            NodeSlot::Navigator => None,
        }
    }

    /// A node with neither a value nor children.
    #[inline]
    pub fn is_orphan(&self) -> bool {
        !self.has_value() && !self.has_any_child()
    }

    /// Counts value nodes in this subtree, including this node.
    pub fn count_values(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += usize::from(node.has_value());
            pending.extend(node.children.values().map(Box::as_ref));
        }
        count
    }

    /// Children in ascending key order.
    pub fn sorted_children(&self) -> Vec<&TrieNode<T>> {
        let mut children: Vec<&TrieNode<T>> = self.children.values().map(Box::as_ref).collect();
        children.sort_unstable_by_key(|child| child.key);
        children
    }

    /// Appends every stored key below this node to `out` in ascending order,
    /// each prefixed by `path` (the key of this node itself is expected to be
    /// in `path`).
    pub fn collect_into(&self, path: &mut String, out: &mut Vec<(String, T)>)
    where
        T: Clone,
    {
        if let NodeSlot::Value(value) = &self.slot {
            out.push((path.clone(), value.clone()));
        }

        // Entries carry the byte length of the parent's path.
        let base = path.len();
        let mut pending: Vec<(&TrieNode<T>, usize)> = self
            .sorted_children()
            .into_iter()
            .rev()
            .map(|child| (child, base))
            .collect();
        while let Some((node, parent_len)) = pending.pop() {
            path.truncate(parent_len);
            path.push(node.key);
            if let NodeSlot::Value(value) = &node.slot {
                out.push((path.clone(), value.clone()));
            }
            let len = path.len();
            pending.extend(node.sorted_children().into_iter().rev().map(|child| (child, len)));
        }
        path.truncate(base);
    }

    /// Tries to take this node's latch in shared mode without blocking.
    pub fn guard_read(&self) -> NodeGuard<'_, T> {
        NodeGuard::read(self)
    }

    /// Tries to take this node's latch in exclusive mode without blocking.
    pub fn guard_write(&self) -> NodeGuard<'_, T> {
        NodeGuard::write(self)
    }

    /// Shared guard over the child under `key`; `None` if there is no child.
    pub fn child_guard_read(&self, key: char) -> Option<NodeGuard<'_, T>> {
        self.child(key).map(NodeGuard::read)
    }

    /// Exclusive guard over the child under `key`; `None` if there is no child.
    pub fn child_guard_write(&self, key: char) -> Option<NodeGuard<'_, T>> {
        self.child(key).map(NodeGuard::write)
    }

    /// Writes this subtree as indented lines, one per node.
    ///
    /// Each line is `depth` spaces followed by the escaped key; value nodes
    /// append ` : <value>`. Children follow in ascending key order.
    pub fn print<W: Write + ?Sized>(&self, out: &mut W, depth: usize) -> io::Result<()>
    where
        T: Display,
    {
        let mut pending = vec![(self, depth)];
        while let Some((node, depth)) = pending.pop() {
            let key = node.key.escape_debug();
            match &node.slot {
                NodeSlot::Value(value) => writeln!(out, "{:depth$}{key} : {value}", "")?,
                NodeSlot::Navigator => writeln!(out, "{:depth$}{key}", "")?,
            }
            pending.extend(
                node.sorted_children()
                    .into_iter()
                    .rev()
                    .map(|child| (child, depth + 1)),
            );
        }
        Ok(())
    }
}

impl<T: Debug> Debug for TrieNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrieNode")
            .field("key", &self.key)
            .field("slot", &self.slot)
            .field("children", &self.children.len())
            .finish()
    }
}

impl<T> Drop for TrieNode<T> {
    fn drop(&mut self) {
        // Detach descendants first so each box drops with an empty map.
        let mut pending: Vec<Box<TrieNode<T>>> =
            self.children.drain().map(|(_, child)| child).collect();
        while let Some(mut node) = pending.pop() {
            pending.extend(node.children.drain().map(|(_, child)| child));
        }
    }
}

/// Non-blocking guard over a node's latch.
///
/// Acquisition is attempted once with `try_read`/`try_write`. A failed guard
/// holds nothing and hides the node; callers must treat that as "retry or
/// abandon", never as "key absent". The latch is released on drop.
#[derive(Debug)]
pub struct NodeGuard<'a, T> {
    node: &'a TrieNode<T>,
    shared: Option<RwLockReadGuard<'a, ()>>,
    exclusive: Option<RwLockWriteGuard<'a, ()>>,
}

impl<'a, T> NodeGuard<'a, T> {
    /// Attempts a shared acquisition of `node`'s latch.
    pub fn read(node: &'a TrieNode<T>) -> Self {
        Self {
            node,
            shared: node.latch.try_read(),
            exclusive: None,
        }
    }

    /// Attempts an exclusive acquisition of `node`'s latch.
    pub fn write(node: &'a TrieNode<T>) -> Self {
        Self {
            node,
            shared: None,
            exclusive: node.latch.try_write(),
        }
    }

    /// Whether the latch was acquired.
    pub fn succeeded(&self) -> bool {
        self.shared.is_some() || self.exclusive.is_some()
    }

    /// Whether the latch is held in exclusive mode.
    pub fn is_exclusive(&self) -> bool {
        self.exclusive.is_some()
    }

    /// The guarded node, or `None` if acquisition failed.
    pub fn node(&self) -> Option<&'a TrieNode<T>> {
        self.succeeded().then_some(self.node)
    }
}
