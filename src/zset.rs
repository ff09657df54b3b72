//! A sorted set of named members with `f64` scores.
//!
//! Each member is one [`ZNode`] record holding both an [`AvlLinks`] and a
//! [`HashLinks`]. The hash index answers "is this name present" in O(1) and
//! the tree keeps records ordered by `(score, name)` for range and rank
//! queries in O(log n). A record is in the set if and only if it is reachable
//! through both.
//!
//! Records are referred to by [`Handle`]. A handle stays valid until its
//! member is popped or the set is cleared; always obtain handles from
//! [`lookup`](ZSet::lookup), [`query`](ZSet::query) or [`offset`](ZSet::offset)
//! right before using them.
//!
//! # Example
//!
//! ```
//! use kvcore::ZSet;
//!
//! let mut zset = ZSet::new();
//! zset.add(b"alice", 100.0);
//! zset.add(b"bob", 85.0);
//! zset.add(b"carol", 92.0);
//!
//! let bob = zset.lookup(b"bob").unwrap();
//! assert_eq!(zset.rank(bob), 0);
//!
//! let next = zset.offset(bob, 1).unwrap();
//! assert_eq!(zset.get(next).name(), b"carol");
//!
//! let top: Vec<&[u8]> = zset.range(90.0, b"", 0, 10).into_iter().map(|h| zset.get(h).name()).collect();
//! assert_eq!(top, [&b"carol"[..], &b"alice"[..]]);
//! ```

use core::cmp::Ordering;

use tracing::{debug, warn};

use crate::avl::{AvlEntry, AvlLinks, AvlTree};
use crate::config::HMapConfig;
use crate::error::Error;
use crate::hash::str_hash;
use crate::hashtable::{HMap, HashEntry, HashLinks};
use crate::pool::ThreadPool;
use crate::raw::{Arena, Handle};

/// Sets with more members than this are freed on the worker pool by [`ZSet::dispose`].
pub const LARGE_CONTAINER_SIZE: usize = 10_000;

/// One member of a [`ZSet`].
#[derive(Clone, Debug)]
pub struct ZNode {
    tree: AvlLinks,
    hash: HashLinks,
    score: f64,
    name: Box<[u8]>,
}

impl ZNode {
    fn new(name: &[u8], score: f64) -> Self {
        Self {
            tree: AvlLinks::new(),
            hash: HashLinks::new(str_hash(name)),
            score,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }
}

impl AvlEntry for ZNode {
    fn avl_links(&self) -> &AvlLinks {
        &self.tree
    }

    fn avl_links_mut(&mut self) -> &mut AvlLinks {
        &mut self.tree
    }
}

impl HashEntry for ZNode {
    fn hash_links(&self) -> &HashLinks {
        &self.hash
    }

    fn hash_links_mut(&mut self) -> &mut HashLinks {
        &mut self.hash
    }
}

// Orders by score, then bytewise by name with a strict prefix first.
// `total_cmp` keeps NaN scores from breaking the ordering.
fn zless(node: &ZNode, score: f64, name: &[u8]) -> bool {
    match node.score.total_cmp(&score) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => *node.name < *name,
    }
}

fn node_less(a: &ZNode, b: &ZNode) -> bool {
    zless(a, b.score, &b.name)
}

#[derive(Clone, Debug, Default)]
pub struct ZSet {
    nodes: Arena<ZNode>,
    index: HMap,
    tree: AvlTree,
}

impl ZSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set whose name index uses `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` fails validation.
    pub fn with_config(config: HMapConfig) -> Result<Self, Error> {
        Ok(Self {
            nodes: Arena::new(),
            index: HMap::with_config(config)?,
            tree: AvlTree::new(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Inserts `name` with `score`, or moves an existing member to `score`.
    ///
    /// Returns `true` if a new member was added.
    pub fn add(&mut self, name: &[u8], score: f64) -> bool {
        if let Some(node) = self.lookup(name) {
            self.update(node, score);
            return false;
        }

        let node = self.nodes.alloc(ZNode::new(name, score));
        self.index.insert(&mut self.nodes, node);
        self.tree.insert(&mut self.nodes, node, node_less);
        true
    }

    /// Changes the score of the member at `node`, repositioning it in the tree.
    ///
    /// Setting the score it already has leaves the tree untouched.
    pub fn update(&mut self, node: Handle, score: f64) {
        if self.nodes.get(node).score.total_cmp(&score).is_eq() {
            return;
        }
        self.tree.delete(&mut self.nodes, node);
        self.nodes.get_mut(node).score = score;
        self.tree.insert(&mut self.nodes, node, node_less);
    }

    /// Finds a member by name.
    ///
    /// Takes `&mut self` because every lookup advances an in-progress resize
    /// of the name index.
    pub fn lookup(&mut self, name: &[u8]) -> Option<Handle> {
        if self.tree.is_empty() {
            return None;
        }
        self.index.lookup(&mut self.nodes, str_hash(name), |node| *node.name == *name)
    }

    /// Returns the score of `name`, if present.
    pub fn score(&mut self, name: &[u8]) -> Option<f64> {
        let node = self.lookup(name)?;
        Some(self.nodes.get(node).score)
    }

    /// # Panics
    ///
    /// Panics if `node` is not a live member of this set.
    #[must_use]
    pub fn get(&self, node: Handle) -> &ZNode {
        self.nodes.get(node)
    }

    /// Finds the first member whose `(score, name)` is not less than the given pair.
    #[must_use]
    pub fn query(&self, score: f64, name: &[u8]) -> Option<Handle> {
        let mut found = None;
        let mut current = self.tree.root();
        while let Some(node) = current {
            let record = self.nodes.get(node);
            if zless(record, score, name) {
                current = record.tree.right();
            } else {
                found = Some(node);
                current = record.tree.left();
            }
        }
        found
    }

    /// Removes `name` and hands its record to the caller.
    pub fn pop(&mut self, name: &[u8]) -> Option<ZNode> {
        if self.tree.is_empty() {
            return None;
        }
        let node = self.index.remove(&mut self.nodes, str_hash(name), |node| *node.name == *name)?;
        self.tree.delete(&mut self.nodes, node);
        Some(self.nodes.take(node))
    }

    /// Returns the member `offset` ranks after `node` (before it, if negative).
    #[must_use]
    pub fn offset(&self, node: Handle, offset: i64) -> Option<Handle> {
        self.tree.offset(&self.nodes, node, offset)
    }

    /// Returns the zero-based rank of `node` in `(score, name)` order.
    #[must_use]
    pub fn rank(&self, node: Handle) -> usize {
        self.tree.rank(&self.nodes, node)
    }

    /// Seeks to the first member not less than `(score, name)`, skips
    /// `offset` members (backwards if negative) and collects up to `limit`.
    #[must_use]
    pub fn range(&self, score: f64, name: &[u8], offset: i64, limit: usize) -> Vec<Handle> {
        let mut out = Vec::new();
        let mut current = self.query(score, name).and_then(|node| self.offset(node, offset));
        while let Some(node) = current
            && out.len() < limit
        {
            out.push(node);
            current = self.offset(node, 1);
        }
        out
    }

    /// Iterates members in `(score, name)` order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (Handle, &ZNode)> + '_ {
        self.tree.iter(&self.nodes)
    }

    /// Removes every member.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.index.clear();
        self.nodes.clear();
    }

    /// Drops the set, on `pool` if it is large enough to stall the caller.
    ///
    /// Small sets, and every set when no pool is given or the pool has shut
    /// down, are dropped right here. Returns `true` if the drop was handed to
    /// the pool.
    pub fn dispose(self, pool: Option<&ThreadPool>) -> bool {
        let len = self.len();
        let Some(pool) = pool.filter(|_| len > LARGE_CONTAINER_SIZE) else {
            return false;
        };
        match pool.submit(move || drop(self)) {
            Ok(()) => {
                debug!(len, "sorted set handed to worker pool for destruction");
                true
            }
            Err(err) => {
                warn!(%err, len, "sorted set freed inline");
                false
            }
        }
    }
}
