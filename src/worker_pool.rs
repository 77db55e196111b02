// =============================================================================
// Worker Pool: fixed-size thread pool with FIFO queue and blocking drain
// =============================================================================
//
// Tasks are queued on an unbounded crossbeam channel and picked up by `W`
// named worker threads.  A pending counter (queued + running) guarded by a
// parking_lot mutex is paired with a condvar so `drain()` sleeps until the
// last task finishes instead of polling.
//
// The worker boundary contains failures: a task returning `Err` is logged,
// a panicking task is caught and logged, and the worker moves on.
// =============================================================================

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::{debug, error, info};

/// A unit of work. Errors and panics stop at the worker boundary.
pub type Task = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker pool is shut down")]
    ShutDown,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

/// Task counters since the pool started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub completed: usize,
    pub failed: usize,
    pub panicked: usize,
}

struct Shared {
    pending: Mutex<usize>,
    idle: Condvar,
    completed: AtomicUsize,
    failed: AtomicUsize,
    panicked: AtomicUsize,
}

impl Shared {
    fn finish_one(&self) {
        let mut pending = self.pending.lock();
        *pending -= 1;
        if *pending == 0 {
            self.idle.notify_all();
        }
    }
}

pub struct WorkerPool {
    sender: Mutex<Option<Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shared: Arc<Shared>,
    size: usize,
}

impl WorkerPool {
    /// Start `size` workers; `0` means one per available CPU.
    pub fn new(size: usize) -> Result<Self, PoolError> {
        let size = if size == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            size
        };

        let (sender, receiver) = unbounded::<Task>();
        let shared = Arc::new(Shared {
            pending: Mutex::new(0),
            idle: Condvar::new(),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            panicked: AtomicUsize::new(0),
        });

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = receiver.clone();
            let shared = shared.clone();
            let handle = std::thread::Builder::new()
                .name(format!("augment-worker-{id}"))
                .spawn(move || worker_loop(id, receiver, shared))
                .map_err(|e| PoolError::Spawn(e.to_string()))?;
            workers.push(handle);
        }

        info!(workers = size, "worker pool started");

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            shared,
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue a task and return immediately.
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let sender = self.sender.lock();
        let sender = sender.as_ref().ok_or(PoolError::ShutDown)?;

        *self.shared.pending.lock() += 1;
        if sender.send(Box::new(task)).is_err() {
            self.shared.finish_one();
            return Err(PoolError::ShutDown);
        }
        Ok(())
    }

    /// Block until every submitted task has finished.
    pub fn drain(&self) {
        let mut pending = self.shared.pending.lock();
        while *pending > 0 {
            self.shared.idle.wait(&mut pending);
        }
    }

    /// Stop accepting tasks and join every worker. Queued tasks still run.
    /// Calling it again is a no-op.
    pub fn shutdown(&self) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        drop(sender);

        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if handle.join().is_err() {
                error!("worker thread terminated abnormally");
            }
        }
        info!(stats = ?self.stats(), "worker pool shut down");
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            completed: self.shared.completed.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
            panicked: self.shared.panicked.load(Ordering::Relaxed),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(id: usize, receiver: Receiver<Task>, shared: Arc<Shared>) {
    debug!(worker = id, "worker started");
    for task in receiver.iter() {
        match catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(())) => {
                shared.completed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                shared.failed.fetch_add(1, Ordering::Relaxed);
                let detail = format!("{e:#}");
                error!(worker = id, error = %detail, "task failed");
            }
            Err(panic) => {
                shared.panicked.fetch_add(1, Ordering::Relaxed);
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(worker = id, panic = %msg, "task panicked");
            }
        }
        shared.finish_one();
    }
    debug!(worker = id, "worker stopped");
}
