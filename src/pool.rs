//! Worker pool shared by encoder sessions.
//!
//! A pool is built once and lent to encoders; several encoders may use the
//! same pool one after another, keeping the worker threads warm.

use std::num::NonZeroUsize;

use log::debug;

use crate::error::{Error, Result};

/// Fixed-size pool of worker threads.
pub struct ThreadPool {
    inner: rayon::ThreadPool,
    threads: usize,
}

impl ThreadPool {
    /// Build a pool with `threads` workers, or one per available hardware
    /// thread when `None`.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let threads = match threads {
            Some(0) => return Err(Error::InvalidOption("thread count must be positive")),
            Some(n) => n,
            None => default_threads(),
        };
        let inner = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("pngpipe-worker-{i}"))
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;
        debug!("thread pool started with {threads} workers");
        Ok(Self { inner, threads })
    }

    /// Single worker; output is identical to any other thread count, this
    /// only removes scheduling noise.
    pub fn single_threaded() -> Result<Self> {
        Self::new(Some(1))
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `task` on a worker without waiting for it.
    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.spawn(task);
    }

    /// Shut the pool down. Workers finish queued tasks before exiting.
    pub fn release(self) {
        debug!("thread pool with {} workers released", self.threads);
        drop(self.inner);
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("threads", &self.threads)
            .finish()
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
