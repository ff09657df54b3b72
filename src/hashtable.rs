//! An intrusive chaining hash index that resizes incrementally.
//!
//! Records embed a [`HashLinks`] (cached hash code plus the next link of their
//! bucket chain) and live in a caller-owned [`Arena`]. When the load factor
//! reaches its limit the index allocates a table twice the size and moves
//! entries over a bounded number at a time on every later insert, lookup and
//! remove, so no single call pays for the whole rehash.

use core::mem;

use tracing::{debug, trace};

use crate::config::HMapConfig;
use crate::error::Error;
use crate::raw::{Arena, Handle};

/// The hash links embedded in every record that can be placed in an [`HMap`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HashLinks {
    hcode: u64,
    next: Option<Handle>,
}

impl HashLinks {
    /// Detached links carrying the record's hash code.
    #[must_use]
    pub const fn new(hcode: u64) -> Self {
        Self { hcode, next: None }
    }

    #[must_use]
    pub const fn hcode(&self) -> u64 {
        self.hcode
    }
}

/// Access to the [`HashLinks`] embedded in a record.
pub trait HashEntry {
    fn hash_links(&self) -> &HashLinks;
    fn hash_links_mut(&mut self) -> &mut HashLinks;
}

// A fixed-size array of bucket chains.
#[derive(Clone, Debug)]
struct Table {
    buckets: Box<[Option<Handle>]>,
    mask: usize,
    len: usize,
}

impl Table {
    fn with_buckets(buckets: usize) -> Self {
        debug_assert!(buckets.is_power_of_two());
        Self {
            buckets: vec![None; buckets].into_boxed_slice(),
            mask: buckets - 1,
            len: 0,
        }
    }

    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn slot(&self, hcode: u64) -> usize {
        hcode as usize & self.mask
    }

    fn insert<T: HashEntry>(&mut self, nodes: &mut Arena<T>, node: Handle) {
        let slot = self.slot(nodes.get(node).hash_links().hcode);
        nodes.get_mut(node).hash_links_mut().next = self.buckets[slot];
        self.buckets[slot] = Some(node);
        self.len += 1;
    }

    // Returns the matching node together with its predecessor in the chain.
    fn find<T, F>(&self, nodes: &Arena<T>, hcode: u64, eq: &mut F) -> Option<(Option<Handle>, Handle)>
    where
        T: HashEntry,
        F: FnMut(&T) -> bool,
    {
        let mut prev = None;
        let mut current = self.buckets[self.slot(hcode)];
        while let Some(node) = current {
            let entry = nodes.get(node);
            let links = entry.hash_links();
            if links.hcode == hcode && eq(entry) {
                return Some((prev, node));
            }
            prev = Some(node);
            current = links.next;
        }
        None
    }

    fn detach<T: HashEntry>(&mut self, nodes: &mut Arena<T>, hcode: u64, prev: Option<Handle>, node: Handle) {
        let next = mem::take(&mut nodes.get_mut(node).hash_links_mut().next);
        match prev {
            Some(prev) => nodes.get_mut(prev).hash_links_mut().next = next,
            None => {
                let slot = self.slot(hcode);
                self.buckets[slot] = next;
            }
        }
        self.len -= 1;
    }

    fn remove<T, F>(&mut self, nodes: &mut Arena<T>, hcode: u64, eq: &mut F) -> Option<Handle>
    where
        T: HashEntry,
        F: FnMut(&T) -> bool,
    {
        let (prev, node) = self.find(nodes, hcode, eq)?;
        self.detach(nodes, hcode, prev, node);
        Some(node)
    }
}

#[derive(Clone, Debug, Default)]
enum Tables {
    #[default]
    Empty,
    Stable(Table),
    Resizing {
        newer: Table,
        older: Table,
        // Buckets of `older` below this index are already drained.
        cursor: usize,
    },
}

/// A chaining hash index over records stored in an [`Arena`].
///
/// The index never inspects keys itself: callers pass the key's hash code and
/// an equality predicate to [`lookup`](HMap::lookup) and [`remove`](HMap::remove).
#[derive(Clone, Debug, Default)]
pub struct HMap {
    tables: Tables,
    config: HMapConfig,
}

impl HMap {
    /// Creates an empty index with the default configuration. Nothing is
    /// allocated until the first insert.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` fails validation.
    pub fn with_config(config: HMapConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            tables: Tables::Empty,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &HMapConfig {
        &self.config
    }

    /// Returns the number of entries across both tables.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.tables {
            Tables::Empty => 0,
            Tables::Stable(table) => table.len,
            Tables::Resizing { newer, older, .. } => newer.len + older.len,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true while entries are still being moved to a larger table.
    #[must_use]
    pub fn is_resizing(&self) -> bool {
        matches!(self.tables, Tables::Resizing { .. })
    }

    /// Bucket count of the table receiving inserts, or zero before the first insert.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        match &self.tables {
            Tables::Empty => 0,
            Tables::Stable(table) | Tables::Resizing { newer: table, .. } => table.bucket_count(),
        }
    }

    /// Forgets every entry. The records themselves stay in the arena.
    pub fn clear(&mut self) {
        self.tables = Tables::Empty;
    }

    fn newer_mut(&mut self) -> &mut Table {
        if matches!(self.tables, Tables::Empty) {
            self.tables = Tables::Stable(Table::with_buckets(self.config.initial_buckets));
        }
        match &mut self.tables {
            Tables::Stable(table) | Tables::Resizing { newer: table, .. } => table,
            Tables::Empty => unreachable!("table allocated above"),
        }
    }

    /// Adds `node` to the index. Its [`HashLinks`] must already hold its hash code.
    ///
    /// Duplicates are not detected; callers look up first if keys must be unique.
    pub fn insert<T: HashEntry>(&mut self, nodes: &mut Arena<T>, node: Handle) {
        self.newer_mut().insert(nodes, node);

        if let Tables::Stable(table) = &self.tables
            && table.len / table.bucket_count() >= self.config.max_load_factor
        {
            self.start_resizing();
        }
        self.help_resize(nodes);
    }

    fn start_resizing(&mut self) {
        let Tables::Stable(older) = mem::take(&mut self.tables) else {
            unreachable!("resize started while not stable");
        };
        let newer = Table::with_buckets(older.bucket_count() * 2);
        debug!(
            entries = older.len,
            from = older.bucket_count(),
            to = newer.bucket_count(),
            "hash index resize started"
        );
        self.tables = Tables::Resizing { newer, older, cursor: 0 };
    }

    /// Moves up to `max_resize_work` entries from the old table to the new one.
    ///
    /// Called by every insert, lookup and remove; a no-op when no resize is in
    /// progress.
    pub fn help_resize<T: HashEntry>(&mut self, nodes: &mut Arena<T>) {
        let budget = self.config.max_resize_work;
        let Tables::Resizing { newer, older, cursor } = &mut self.tables else {
            return;
        };

        let mut work = 0;
        while work < budget && older.len > 0 {
            let Some(node) = older.buckets[*cursor] else {
                *cursor += 1;
                continue;
            };
            let hcode = nodes.get(node).hash_links().hcode;
            older.detach(nodes, hcode, None, node);
            newer.insert(nodes, node);
            work += 1;
        }
        trace!(moved = work, remaining = older.len, "hash index resize step");
        self.retire_drained();
    }

    // Drops the old table once nothing is left in it.
    fn retire_drained(&mut self) {
        if let Tables::Resizing { older, .. } = &self.tables
            && older.len == 0
        {
            let Tables::Resizing { newer, .. } = mem::take(&mut self.tables) else {
                unreachable!("resize state changed while retiring");
            };
            debug!(entries = newer.len, buckets = newer.bucket_count(), "hash index resize finished");
            self.tables = Tables::Stable(newer);
        }
    }

    /// Finds the entry with hash code `hcode` for which `eq` returns true.
    pub fn lookup<T, F>(&mut self, nodes: &mut Arena<T>, hcode: u64, mut eq: F) -> Option<Handle>
    where
        T: HashEntry,
        F: FnMut(&T) -> bool,
    {
        self.help_resize(nodes);
        match &self.tables {
            Tables::Empty => None,
            Tables::Stable(table) => table.find(nodes, hcode, &mut eq).map(|(_, node)| node),
            Tables::Resizing { newer, older, .. } => newer
                .find(nodes, hcode, &mut eq)
                .or_else(|| older.find(nodes, hcode, &mut eq))
                .map(|(_, node)| node),
        }
    }

    /// Unlinks the matching entry and returns its handle. The record stays in the arena.
    pub fn remove<T, F>(&mut self, nodes: &mut Arena<T>, hcode: u64, mut eq: F) -> Option<Handle>
    where
        T: HashEntry,
        F: FnMut(&T) -> bool,
    {
        self.help_resize(nodes);
        match &mut self.tables {
            Tables::Empty => None,
            Tables::Stable(table) => table.remove(nodes, hcode, &mut eq),
            Tables::Resizing { newer, older, .. } => {
                if let Some(node) = newer.remove(nodes, hcode, &mut eq) {
                    return Some(node);
                }
                let node = older.remove(nodes, hcode, &mut eq);
                self.retire_drained();
                node
            }
        }
    }
}
