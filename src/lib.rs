//! # ordtree
//!
//! An unbalanced binary search tree with ordered traversal.
//!
//! Nodes live in a flat arena and refer to their children by index, so
//! insertion, lookup, deletion and traversal are all iterative: a degenerate
//! (sorted-insertion) tree costs time proportional to its height but never
//! call-stack depth.
//!
//! ## Example
//!
//! ```rust
//! use ordtree::{DeletionOutcome, Error, OrderedTree};
//!
//! let mut tree: OrderedTree<u32, &str> = OrderedTree::new();
//! tree.insert(5, "five").unwrap();
//! tree.insert(3, "three").unwrap();
//! tree.insert(8, "eight").unwrap();
//!
//! assert_eq!(tree.insert(3, "again"), Err(Error::DuplicateKey));
//! assert_eq!(tree.lookup(&3), Ok(&"three"));
//! assert_eq!(tree.delete(&5), DeletionOutcome::Removed("five"));
//! assert_eq!(tree.lookup(&5), Err(Error::NotFound));
//!
//! let keys: Vec<u32> = tree.iter().map(|(k, _)| *k).collect();
//! assert_eq!(keys, [3, 8]);
//! ```
//!
//! The tree performs no internal synchronization. Callers sharing it across
//! threads must serialize mutations against each other and against any live
//! [`Iter`]; the borrow checker already enforces this within one thread.

#![deny(unsafe_code)]

mod arena;
mod error;

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::iter::FusedIterator;

use arena::{Node, NodeArena, Ptr};

pub use error::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Initial reservation for explicit traversal stacks.
const STACK_CAPACITY: usize = 64;

// =============================================================================
// Links
// =============================================================================

/// The slot through which a node is reached: the root, or one child slot of
/// its parent. Rewriting this slot is how nodes are attached and spliced out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Link {
    Root,
    Left(Ptr),
    Right(Ptr),
}

fn set_link<K, V>(nodes: &mut NodeArena<K, V>, root: &mut Ptr, link: Link, child: Ptr) {
    match link {
        Link::Root => *root = child,
        Link::Left(parent) => nodes.get_mut(parent).left = child,
        Link::Right(parent) => nodes.get_mut(parent).right = child,
    }
}

/// Result of walking from the root towards a key.
struct Probe {
    link: Link,
    /// Node holding the key, or NULL if the key is absent (in which case
    /// `link` is where it would be attached).
    target: Ptr,
    depth: usize,
}

// =============================================================================
// Deletion outcome
// =============================================================================

/// Outcome of [`OrderedTree::delete`]. Deleting an absent key is not an error.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeletionOutcome<V> {
    /// The key was present; carries the value that was stored under it.
    Removed(V),
    NotFound,
}

impl<V> DeletionOutcome<V> {
    #[inline]
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed(_))
    }

    #[inline]
    pub fn into_value(self) -> Option<V> {
        match self {
            Self::Removed(value) => Some(value),
            Self::NotFound => None,
        }
    }
}

// =============================================================================
// OrderedTree
// =============================================================================

/// Unbalanced binary search tree mapping unique keys to values.
///
/// For every node, all keys in its left subtree are strictly less than its
/// key and all keys in its right subtree strictly greater. Shape depends
/// entirely on insertion order; no rebalancing is performed.
#[derive(Clone)]
pub struct OrderedTree<K, V> {
    nodes: NodeArena<K, V>,
    root: Ptr,
}

impl<K, V> OrderedTree<K, V> {
    pub fn new() -> Self {
        Self {
            nodes: NodeArena::new(),
            root: Ptr::NULL,
        }
    }

    /// Creates an empty tree with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: NodeArena::with_capacity(capacity),
            root: Ptr::NULL,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_null()
    }

    /// Bytes reserved by node storage, including vacated slots.
    pub fn memory_usage(&self) -> usize {
        self.nodes.capacity_bytes()
    }

    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = Ptr::NULL;
    }

    /// Number of nodes on the longest root-to-leaf path; `0` when empty.
    pub fn height(&self) -> usize {
        if self.root.is_null() {
            return 0;
        }

        let mut stack: Vec<(Ptr, usize)> = Vec::with_capacity(STACK_CAPACITY);
        stack.push((self.root, 1));
        let mut height = 0;
        while let Some((ptr, depth)) = stack.pop() {
            height = height.max(depth);
            let node = self.nodes.get(ptr);
            for child in [node.left, node.right] {
                if !child.is_null() {
                    stack.push((child, depth + 1));
                }
            }
        }
        height
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.extreme(|node| node.left)
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.extreme(|node| node.right)
    }

    fn extreme(&self, next: impl Fn(&Node<K, V>) -> Ptr) -> Option<(&K, &V)> {
        if self.root.is_null() {
            return None;
        }
        let mut node = self.nodes.get(self.root);
        loop {
            let child = next(node);
            if child.is_null() {
                return Some((&node.key, &node.value));
            }
            node = self.nodes.get(child);
        }
    }

    /// In-order traversal: yields every pair in strictly ascending key order.
    ///
    /// Each call starts a fresh traversal; the tree is not modified.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> + FusedIterator + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> + FusedIterator + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Rebuild node storage so live nodes are contiguous, dropping slots
    /// vacated by deletes. Tree shape and contents are unchanged.
    ///
    /// Returns the number of nodes rewritten (`0` if there was nothing to
    /// reclaim).
    pub fn compact(&mut self) -> usize {
        if self.nodes.vacant_slots() == 0 {
            return 0;
        }

        let live = self.nodes.len();
        let mut old_nodes = std::mem::replace(&mut self.nodes, NodeArena::with_capacity(live));
        let old_root = std::mem::replace(&mut self.root, Ptr::NULL);
        let mut rewritten = 0usize;

        // Pre-order: each node is placed before its subtrees.
        let mut stack: Vec<(Ptr, Link)> = Vec::with_capacity(STACK_CAPACITY);
        if !old_root.is_null() {
            stack.push((old_root, Link::Root));
        }
        while let Some((old_ptr, link)) = stack.pop() {
            let mut node = old_nodes.free(old_ptr);
            let (left, right) = (node.left, node.right);
            node.left = Ptr::NULL;
            node.right = Ptr::NULL;

            let new_ptr = self.nodes.alloc(node);
            set_link(&mut self.nodes, &mut self.root, link, new_ptr);
            rewritten += 1;

            if !right.is_null() {
                stack.push((right, Link::Right(new_ptr)));
            }
            if !left.is_null() {
                stack.push((left, Link::Left(new_ptr)));
            }
        }

        debug_assert_eq!(old_nodes.len(), 0, "compaction left unreachable nodes");
        tracing::debug!(rewritten, "compacted node arena");
        rewritten
    }
}

impl<K: Ord, V> OrderedTree<K, V> {
    fn locate<Q>(&self, key: &Q) -> Probe
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut link = Link::Root;
        let mut current = self.root;
        let mut depth = 0;

        while !current.is_null() {
            let node = self.nodes.get(current);
            match key.cmp(node.key.borrow()) {
                Ordering::Less => {
                    link = Link::Left(current);
                    current = node.left;
                }
                Ordering::Greater => {
                    link = Link::Right(current);
                    current = node.right;
                }
                Ordering::Equal => break,
            }
            depth += 1;
        }

        Probe {
            link,
            target: current,
            depth,
        }
    }

    /// Inserts a new pair.
    ///
    /// Fails with [`Error::DuplicateKey`] if `key` is already present, leaving
    /// the tree (including the existing value) untouched. To replace a value,
    /// [`delete`](Self::delete) the key first.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        let probe = self.locate(&key);
        if !probe.target.is_null() {
            tracing::debug!(depth = probe.depth, "rejected duplicate key");
            return Err(Error::DuplicateKey);
        }

        let ptr = self.nodes.alloc(Node::leaf(key, value));
        set_link(&mut self.nodes, &mut self.root, probe.link, ptr);
        tracing::trace!(depth = probe.depth, len = self.len(), "inserted key");
        Ok(())
    }

    /// Returns the value stored under `key`, or [`Error::NotFound`].
    pub fn lookup<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).ok_or(Error::NotFound)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let target = self.locate(key).target;
        (!target.is_null()).then(|| &self.nodes.get(target).value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        !self.locate(key).target.is_null()
    }

    /// Removes `key`, returning its value.
    ///
    /// A node with two children takes over the key and value of its in-order
    /// predecessor (the rightmost node of its left subtree), and the
    /// predecessor's original node is spliced out instead. The predecessor has
    /// no right child, so that splice is always the leaf or one-child case.
    pub fn delete<Q>(&mut self, key: &Q) -> DeletionOutcome<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Probe { link, target, .. } = self.locate(key);
        if target.is_null() {
            return DeletionOutcome::NotFound;
        }

        let (left, right) = {
            let node = self.nodes.get(target);
            (node.left, node.right)
        };

        let (case, value) = match (left.is_null(), right.is_null()) {
            (true, true) => {
                set_link(&mut self.nodes, &mut self.root, link, Ptr::NULL);
                ("leaf", self.nodes.free(target).value)
            }
            (false, true) | (true, false) => {
                let child = if left.is_null() { right } else { left };
                set_link(&mut self.nodes, &mut self.root, link, child);
                ("one-child", self.nodes.free(target).value)
            }
            (false, false) => {
                let mut pred_link = Link::Left(target);
                let mut pred = left;
                loop {
                    let next = self.nodes.get(pred).right;
                    if next.is_null() {
                        break;
                    }
                    pred_link = Link::Right(pred);
                    pred = next;
                }

                let pred_left = self.nodes.get(pred).left;
                set_link(&mut self.nodes, &mut self.root, pred_link, pred_left);
                let Node {
                    key: pred_key,
                    value: pred_value,
                    ..
                } = self.nodes.free(pred);

                let node = self.nodes.get_mut(target);
                node.key = pred_key;
                ("two-children", std::mem::replace(&mut node.value, pred_value))
            }
        };

        tracing::trace!(case, len = self.len(), "deleted key");
        DeletionOutcome::Removed(value)
    }
}

impl<K, V> Default for OrderedTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for OrderedTree<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V> IntoIterator for &'a OrderedTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// In-order iterator over an [`OrderedTree`].
///
/// The stack holds the not-yet-visited ancestors along the current leftmost
/// path, so its depth is bounded by the tree height. Cloning snapshots the
/// traversal position.
pub struct Iter<'a, K, V> {
    nodes: &'a NodeArena<K, V>,
    stack: Vec<Ptr>,
    remaining: usize,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes,
            stack: self.stack.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iter<'a, K, V> {
    fn new(tree: &'a OrderedTree<K, V>) -> Self {
        let mut iter = Self {
            nodes: &tree.nodes,
            stack: Vec::new(),
            remaining: tree.len(),
        };
        if !tree.root.is_null() {
            iter.stack.reserve(STACK_CAPACITY);
            iter.push_left_spine(tree.root);
        }
        iter
    }

    fn push_left_spine(&mut self, mut ptr: Ptr) {
        while !ptr.is_null() {
            self.stack.push(ptr);
            ptr = self.nodes.get(ptr).left;
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let ptr = self.stack.pop()?;
        let nodes = self.nodes;
        let node = nodes.get(ptr);
        self.push_left_spine(node.right);
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}


#[cfg(test)]
mod proptests;
