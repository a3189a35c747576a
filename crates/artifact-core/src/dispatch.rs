//! Where gateway calls run.
//!
//! The coordinator hands every gateway call to a [`Spawner`] as a boxed [`Job`]; the job sends its
//! result back over a channel that the coordinator drains in `poll()`. This keeps the coordinator
//! runtime-agnostic: [`ThreadSpawner`] runs jobs on short-lived background threads, while
//! [`QueuedSpawner`] holds them until the host (or a test) runs them explicitly.
//!
//! A spawner that cannot schedule a job reports it; the coordinator then resolves the call as an
//! unavailable store instead of waiting for a result that will never come.

use std::collections::VecDeque;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Executes jobs off the caller's thread (or defers them).
pub trait Spawner: Send + Sync {
    /// Schedule `job`. Must not run it synchronously on the caller's stack.
    ///
    /// On error the job has been dropped without running.
    fn spawn(&self, job: Job) -> io::Result<()>;
}

/// Runs each job on its own named background thread.
#[derive(Debug, Clone, Default)]
pub struct ThreadSpawner {
    name: Option<String>,
}

impl ThreadSpawner {
    /// Create a spawner using the default thread name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `name` for spawned threads.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

impl Spawner for ThreadSpawner {
    fn spawn(&self, job: Job) -> io::Result<()> {
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| "artifact-gateway".to_string());
        thread::Builder::new().name(name).spawn(job)?;
        Ok(())
    }
}

/// Holds jobs until they are run explicitly, in FIFO order.
#[derive(Default)]
pub struct QueuedSpawner {
    queue: Mutex<VecDeque<Job>>,
}

impl std::fmt::Debug for QueuedSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedSpawner")
            .field("pending", &self.pending())
            .finish()
    }
}

impl QueuedSpawner {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of jobs waiting.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Run the oldest job. Returns `false` if the queue was empty.
    pub fn run_next(&self) -> bool {
        // Pop first so the job may enqueue more work without deadlocking.
        let job = self.lock().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run jobs until the queue is empty (including jobs enqueued meanwhile). Returns the count.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Spawner for QueuedSpawner {
    fn spawn(&self, job: Job) -> io::Result<()> {
        self.lock().push_back(job);
        Ok(())
    }
}
