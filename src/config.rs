//! Tunables for the hash index and the worker pool.
//!
//! Both structs deserialize with every field optional, so an embedding server
//! can nest them in its own configuration file and override only what it needs.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Sizing and migration budget of an [`HMap`](crate::hashtable::HMap).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HMapConfig {
    /// Bucket count of the first table. Must be a power of two.
    pub initial_buckets: usize,
    /// Entries per bucket at which a resize starts.
    pub max_load_factor: usize,
    /// Entries migrated from the old table per operation during a resize.
    pub max_resize_work: usize,
}

impl Default for HMapConfig {
    fn default() -> Self {
        Self {
            initial_buckets: 4,
            max_load_factor: 8,
            max_resize_work: 128,
        }
    }
}

impl HMapConfig {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the bucket count is not a power of
    /// two or if the load factor or the work budget is zero.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.initial_buckets.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "initial_buckets must be a power of two, got {}",
                self.initial_buckets
            )));
        }
        if self.max_load_factor == 0 {
            return Err(Error::InvalidConfig("max_load_factor must be at least 1".into()));
        }
        if self.max_resize_work == 0 {
            return Err(Error::InvalidConfig("max_resize_work must be at least 1".into()));
        }
        Ok(())
    }
}

/// Shape of a [`ThreadPool`](crate::pool::ThreadPool).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub workers: usize,
    /// Prefix for worker thread names; the worker index is appended.
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            thread_name: "kvcore-worker".into(),
        }
    }
}

impl PoolConfig {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if no workers are requested.
    pub fn validate(&self) -> Result<(), Error> {
        if self.workers == 0 {
            return Err(Error::InvalidConfig("workers must be at least 1".into()));
        }
        Ok(())
    }
}
