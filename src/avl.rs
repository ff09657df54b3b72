//! An intrusive AVL tree augmented with subtree sizes.
//!
//! The tree does not own its records. Each record embeds an [`AvlLinks`] and
//! lives in an [`Arena`] owned by the caller; [`AvlTree`] only remembers the
//! root handle. Ordering is supplied per insertion by a `less` predicate, so
//! the tree has no knowledge of what the records contain.
//!
//! Every node caches its subtree height (for the AVL balance rule) and its
//! subtree size (for relative-rank queries via [`AvlTree::offset`]).
//!
//! # Example
//!
//! ```
//! use kvcore::avl::{AvlEntry, AvlLinks, AvlTree};
//! use kvcore::Arena;
//!
//! struct Item {
//!     links: AvlLinks,
//!     key: u32,
//! }
//!
//! impl AvlEntry for Item {
//!     fn avl_links(&self) -> &AvlLinks {
//!         &self.links
//!     }
//!
//!     fn avl_links_mut(&mut self) -> &mut AvlLinks {
//!         &mut self.links
//!     }
//! }
//!
//! let mut nodes: Arena<Item> = Arena::new();
//! let mut tree = AvlTree::new();
//! for key in [30, 10, 20] {
//!     let handle = nodes.alloc(Item { links: AvlLinks::new(), key });
//!     tree.insert(&mut nodes, handle, |a, b| a.key < b.key);
//! }
//!
//! let first = tree.first(&nodes).unwrap();
//! assert_eq!(nodes.get(first).key, 10);
//! let third = tree.offset(&nodes, first, 2).unwrap();
//! assert_eq!(nodes.get(third).key, 30);
//! assert!(tree.offset(&nodes, first, 3).is_none());
//! ```

use crate::raw::{Arena, Handle};

/// The tree links embedded in every record that can be placed in an [`AvlTree`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AvlLinks {
    height: u32,
    size: u32,
    left: Option<Handle>,
    right: Option<Handle>,
    // Never owning; only followed upward.
    parent: Option<Handle>,
}

impl Default for AvlLinks {
    fn default() -> Self {
        Self::new()
    }
}

impl AvlLinks {
    /// Links for a detached single-node subtree.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            height: 1,
            size: 1,
            left: None,
            right: None,
            parent: None,
        }
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of nodes in the subtree rooted here, including this one.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub const fn left(&self) -> Option<Handle> {
        self.left
    }

    #[must_use]
    pub const fn right(&self) -> Option<Handle> {
        self.right
    }

    #[must_use]
    pub const fn parent(&self) -> Option<Handle> {
        self.parent
    }
}

/// Access to the [`AvlLinks`] embedded in a record.
pub trait AvlEntry {
    fn avl_links(&self) -> &AvlLinks;
    fn avl_links_mut(&mut self) -> &mut AvlLinks;
}

#[inline]
fn links<T: AvlEntry>(nodes: &Arena<T>, node: Handle) -> &AvlLinks {
    nodes.get(node).avl_links()
}

#[inline]
fn links_mut<T: AvlEntry>(nodes: &mut Arena<T>, node: Handle) -> &mut AvlLinks {
    nodes.get_mut(node).avl_links_mut()
}

#[inline]
fn height<T: AvlEntry>(nodes: &Arena<T>, node: Option<Handle>) -> u32 {
    node.map_or(0, |n| links(nodes, n).height)
}

#[inline]
fn size<T: AvlEntry>(nodes: &Arena<T>, node: Option<Handle>) -> u32 {
    node.map_or(0, |n| links(nodes, n).size)
}

/// Points `parent`'s child slot that currently holds `old` at `new`.
fn replace_child<T: AvlEntry>(nodes: &mut Arena<T>, parent: Handle, old: Handle, new: Option<Handle>) {
    let parent = links_mut(nodes, parent);
    if parent.left == Some(old) {
        parent.left = new;
    } else {
        parent.right = new;
    }
}

/// Recomputes `node`'s height and size from its children.
pub fn update<T: AvlEntry>(nodes: &mut Arena<T>, node: Handle) {
    let AvlLinks { left, right, .. } = *links(nodes, node);
    let height = 1 + height(nodes, left).max(height(nodes, right));
    let size = 1 + size(nodes, left) + size(nodes, right);

    let links = links_mut(nodes, node);
    links.height = height;
    links.size = size;
}

/// Rotates the subtree rooted at `node` to the left and returns the new subtree root.
///
/// The new root inherits `node`'s parent pointer, but the parent's child slot
/// is left for the caller to update.
///
/// # Panics
///
/// Panics if `node` has no right child.
pub fn rotate_left<T: AvlEntry>(nodes: &mut Arena<T>, node: Handle) -> Handle {
    let AvlLinks { right, parent, .. } = *links(nodes, node);
    let new_root = right.expect("`rotate_left()` - `node` has no right child!");
    let inner = links(nodes, new_root).left;

    if let Some(inner) = inner {
        links_mut(nodes, inner).parent = Some(node);
    }
    links_mut(nodes, node).right = inner;
    links_mut(nodes, node).parent = Some(new_root);
    let root = links_mut(nodes, new_root);
    root.left = Some(node);
    root.parent = parent;

    update(nodes, node);
    update(nodes, new_root);
    new_root
}

/// Mirror image of [`rotate_left`].
///
/// # Panics
///
/// Panics if `node` has no left child.
pub fn rotate_right<T: AvlEntry>(nodes: &mut Arena<T>, node: Handle) -> Handle {
    let AvlLinks { left, parent, .. } = *links(nodes, node);
    let new_root = left.expect("`rotate_right()` - `node` has no left child!");
    let inner = links(nodes, new_root).right;

    if let Some(inner) = inner {
        links_mut(nodes, inner).parent = Some(node);
    }
    links_mut(nodes, node).left = inner;
    links_mut(nodes, node).parent = Some(new_root);
    let root = links_mut(nodes, new_root);
    root.right = Some(node);
    root.parent = parent;

    update(nodes, node);
    update(nodes, new_root);
    new_root
}

// Left subtree is two levels taller than the right one.
fn fix_left<T: AvlEntry>(nodes: &mut Arena<T>, node: Handle) -> Handle {
    let left = links(nodes, node).left.expect("`fix_left()` - `node` has no left child!");
    let AvlLinks {
        left: outer,
        right: inner,
        ..
    } = *links(nodes, left);
    if height(nodes, outer) < height(nodes, inner) {
        let rotated = rotate_left(nodes, left);
        links_mut(nodes, node).left = Some(rotated);
    }
    rotate_right(nodes, node)
}

// Right subtree is two levels taller than the left one.
fn fix_right<T: AvlEntry>(nodes: &mut Arena<T>, node: Handle) -> Handle {
    let right = links(nodes, node).right.expect("`fix_right()` - `node` has no right child!");
    let AvlLinks {
        left: inner,
        right: outer,
        ..
    } = *links(nodes, right);
    if height(nodes, outer) < height(nodes, inner) {
        let rotated = rotate_right(nodes, right);
        links_mut(nodes, node).right = Some(rotated);
    }
    rotate_left(nodes, node)
}

/// Restores heights, sizes and balance from `node` up to the root, returning the root.
pub fn fix<T: AvlEntry>(nodes: &mut Arena<T>, node: Handle) -> Handle {
    let mut node = node;
    loop {
        update(nodes, node);
        let AvlLinks { left, right, parent, .. } = *links(nodes, node);
        let (l, r) = (height(nodes, left), height(nodes, right));

        // Which of the parent's slots to splice the rebalanced subtree into.
        let from = parent.map(|p| (p, links(nodes, p).left == Some(node)));

        if l == r + 2 {
            node = fix_left(nodes, node);
        } else if l + 2 == r {
            node = fix_right(nodes, node);
        }

        let Some((parent, is_left)) = from else {
            return node;
        };
        let slot = links_mut(nodes, parent);
        if is_left {
            slot.left = Some(node);
        } else {
            slot.right = Some(node);
        }
        node = parent;
    }
}

// Unlinks `node` and returns the new root. The successor of a node with two
// children keeps its own slot and takes over `node`'s position.
fn delete_node<T: AvlEntry>(nodes: &mut Arena<T>, node: Handle) -> Option<Handle> {
    let AvlLinks { left, right, parent, .. } = *links(nodes, node);

    let Some(right) = right else {
        if let Some(left) = left {
            links_mut(nodes, left).parent = parent;
        }
        return match parent {
            Some(parent) => {
                replace_child(nodes, parent, node, left);
                Some(fix(nodes, parent))
            }
            None => left,
        };
    };

    let mut successor = right;
    while let Some(next) = links(nodes, successor).left {
        successor = next;
    }
    let root = delete_node(nodes, successor);

    // Rebalancing above may have moved `node`; take its links as they are now.
    let position = *links(nodes, node);
    *links_mut(nodes, successor) = position;
    if let Some(left) = position.left {
        links_mut(nodes, left).parent = Some(successor);
    }
    if let Some(right) = position.right {
        links_mut(nodes, right).parent = Some(successor);
    }

    match position.parent {
        Some(parent) => {
            replace_child(nodes, parent, node, Some(successor));
            root
        }
        None => Some(successor),
    }
}

/// The root of an intrusive order-statistic AVL tree.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AvlTree {
    root: Option<Handle>,
}

impl AvlTree {
    /// Creates an empty tree.
    #[must_use]
    pub const fn new() -> Self {
        Self { root: None }
    }

    #[must_use]
    pub const fn root(&self) -> Option<Handle> {
        self.root
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of nodes in the tree.
    #[must_use]
    pub fn len<T: AvlEntry>(&self, nodes: &Arena<T>) -> usize {
        size(nodes, self.root) as usize
    }

    /// Forgets every node. The records themselves stay in `nodes`.
    pub fn clear(&mut self) {
        self.root = None;
    }

    /// Links `node` into the tree as a leaf and rebalances.
    ///
    /// `less(a, b)` must be a strict weak ordering; `node` goes left of every
    /// node it is less than. Any links `node` carried before are overwritten.
    pub fn insert<T, F>(&mut self, nodes: &mut Arena<T>, node: Handle, mut less: F)
    where
        T: AvlEntry,
        F: FnMut(&T, &T) -> bool,
    {
        *links_mut(nodes, node) = AvlLinks::new();

        let mut parent = None;
        let mut go_left = false;
        let mut current = self.root;
        while let Some(cur) = current {
            parent = Some(cur);
            go_left = less(nodes.get(node), nodes.get(cur));
            let cur = links(nodes, cur);
            current = if go_left { cur.left } else { cur.right };
        }

        let Some(parent) = parent else {
            self.root = Some(node);
            return;
        };
        let slot = links_mut(nodes, parent);
        if go_left {
            slot.left = Some(node);
        } else {
            slot.right = Some(node);
        }
        links_mut(nodes, node).parent = Some(parent);
        self.root = Some(fix(nodes, parent));
    }

    /// Unlinks `node` from the tree and rebalances.
    ///
    /// The record stays in `nodes` with fresh, detached links; reclaiming its
    /// slot is up to the caller. `node` must currently be in this tree.
    pub fn delete<T: AvlEntry>(&mut self, nodes: &mut Arena<T>, node: Handle) {
        self.root = delete_node(nodes, node);
        *links_mut(nodes, node) = AvlLinks::new();
    }

    /// Returns the node whose in-order rank is `offset` away from `node`'s.
    ///
    /// `offset` may be negative. Returns `None` when the target rank falls
    /// outside the tree.
    #[must_use]
    pub fn offset<T: AvlEntry>(&self, nodes: &Arena<T>, node: Handle, offset: i64) -> Option<Handle> {
        let mut node = node;
        let mut pos = 0i64;
        while pos != offset {
            let AvlLinks { left, right, parent, .. } = *links(nodes, node);
            if pos < offset
                && pos + i64::from(size(nodes, right)) >= offset
                && let Some(right) = right
            {
                node = right;
                pos += i64::from(size(nodes, links(nodes, right).left)) + 1;
            } else if pos > offset
                && pos - i64::from(size(nodes, left)) <= offset
                && let Some(left) = left
            {
                node = left;
                pos -= i64::from(size(nodes, links(nodes, left).right)) + 1;
            } else {
                let parent = parent?;
                if links(nodes, parent).right == Some(node) {
                    pos -= i64::from(size(nodes, left)) + 1;
                } else {
                    pos += i64::from(size(nodes, right)) + 1;
                }
                node = parent;
            }
        }
        Some(node)
    }

    /// Returns the zero-based in-order rank of `node`.
    #[must_use]
    pub fn rank<T: AvlEntry>(&self, nodes: &Arena<T>, node: Handle) -> usize {
        let mut rank = size(nodes, links(nodes, node).left) as usize;
        let mut current = node;
        while let Some(parent) = links(nodes, current).parent {
            let parent_links = links(nodes, parent);
            if parent_links.right == Some(current) {
                rank += size(nodes, parent_links.left) as usize + 1;
            }
            current = parent;
        }
        rank
    }

    /// Returns the smallest node.
    #[must_use]
    pub fn first<T: AvlEntry>(&self, nodes: &Arena<T>) -> Option<Handle> {
        let mut node = self.root?;
        while let Some(left) = links(nodes, node).left {
            node = left;
        }
        Some(node)
    }

    /// Returns the largest node.
    #[must_use]
    pub fn last<T: AvlEntry>(&self, nodes: &Arena<T>) -> Option<Handle> {
        let mut node = self.root?;
        while let Some(right) = links(nodes, node).right {
            node = right;
        }
        Some(node)
    }

    /// Iterates the tree in order.
    #[must_use]
    pub fn iter<'a, T: AvlEntry>(&self, nodes: &'a Arena<T>) -> Iter<'a, T> {
        Iter {
            tree: *self,
            nodes,
            next: self.first(nodes),
            remaining: self.len(nodes),
        }
    }
}

/// In-order iterator over an [`AvlTree`], yielding handles and records.
pub struct Iter<'a, T> {
    tree: AvlTree,
    nodes: &'a Arena<T>,
    next: Option<Handle>,
    remaining: usize,
}

impl<'a, T: AvlEntry> Iterator for Iter<'a, T> {
    type Item = (Handle, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.offset(self.nodes, current, 1);
        self.remaining -= 1;
        Some((current, self.nodes.get(current)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: AvlEntry> ExactSizeIterator for Iter<'_, T> {}
