//! The crate error type.
//!
//! Tree, hash index and sorted-set operations never fail; absence is reported
//! with `Option`. Only setting things up (configuration, worker threads) and
//! handing work to the pool can go wrong.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("worker pool is shut down")]
    PoolShutDown,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
