//! A small fixed-size worker pool for work that should not run on the
//! caller's thread, such as freeing very large sorted sets.
//!
//! Jobs go through an unbounded crossbeam channel shared by all workers, so
//! scheduling is first-come first-served with no ordering guarantee between
//! workers. Dropping the pool closes the channel, lets the workers drain what
//! is already queued and joins them.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::error::Error;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct ThreadPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Starts `config.workers` named worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a zero worker count and
    /// [`Error::Spawn`] if the OS refuses to create a thread. Workers started
    /// before the failure exit on their own.
    pub fn new(config: &PoolConfig) -> Result<Self, Error> {
        config.validate()?;
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();

        let workers = (0..config.workers)
            .map(|id| {
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("{}-{id}", config.thread_name))
                    .spawn(move || run_worker(id, &receiver))
                    .map_err(Error::Spawn)
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(workers = workers.len(), "worker pool started");
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    /// Number of worker threads still owned by the pool.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Queues `job` to run exactly once on some worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolShutDown`] after [`shutdown`](Self::shutdown). The
    /// job is dropped on the calling thread in that case.
    pub fn submit<F>(&self, job: F) -> Result<(), Error>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(Error::PoolShutDown)?;
        sender.send(Box::new(job)).map_err(|_| Error::PoolShutDown)
    }

    /// Stops accepting jobs, runs everything already queued and joins the workers.
    pub fn shutdown(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("worker thread exited abnormally");
            }
        }
        debug!("worker pool stopped");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(id: usize, jobs: &Receiver<Job>) {
    debug!(worker = id, "worker started");
    // Ends once every sender is gone and the queue is empty.
    for job in jobs {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            warn!(worker = id, "job panicked");
        }
    }
    debug!(worker = id, "worker exiting");
}
