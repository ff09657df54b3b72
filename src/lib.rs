//! In-memory indexing core for a key-value store.
//!
//! This crate provides the three structures a sorted-set capable key-value
//! server is built on:
//!
//! - [`avl`] - an intrusive AVL tree whose nodes cache subtree sizes, giving
//!   O(log n) insert, delete and relative-rank ([`offset`](avl::AvlTree::offset)) queries
//! - [`hashtable`] - an intrusive chaining hash index that grows by moving a
//!   bounded number of entries per operation instead of rehashing all at once
//! - [`zset`] - a sorted set composing one of each: lookup by member name,
//!   ordered and ranked access by `(score, name)`
//!
//! Records live in an [`Arena`] and are linked by [`Handle`]s, so a single
//! record can sit in a tree and a hash index at the same time without any
//! extra allocation or shared ownership.
//!
//! # Example
//!
//! ```
//! use kvcore::ZSet;
//!
//! let mut scores = ZSet::new();
//! scores.add(b"alice", 100.0);
//! scores.add(b"bob", 85.0);
//! scores.add(b"carol", 92.0);
//!
//! // Exact lookup by name.
//! assert_eq!(scores.score(b"bob"), Some(85.0));
//!
//! // Ordered access: first member with score >= 90.
//! let first = scores.query(90.0, b"").unwrap();
//! assert_eq!(scores.get(first).name(), b"carol");
//! assert_eq!(scores.rank(first), 1);
//!
//! // Rank-relative navigation.
//! let last = scores.offset(first, 1).unwrap();
//! assert_eq!(scores.get(last).name(), b"alice");
//! assert!(scores.offset(first, 2).is_none());
//! ```
//!
//! # Concurrency
//!
//! None of the structures are internally synchronized; each instance expects
//! one writer at a time. The only threads involved are those of the optional
//! [`pool::ThreadPool`], used to free very large sets off the caller's thread.

#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod raw;

pub mod avl;
pub mod config;
pub mod error;
pub mod hash;
pub mod hashtable;
pub mod pool;
pub mod zset;

pub use config::{HMapConfig, PoolConfig};
pub use error::Error;
pub use raw::{Arena, Handle};
pub use zset::{ZNode, ZSet};
