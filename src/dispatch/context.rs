//! Dispatcher options and the state shared between the producer and the workers.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use crate::cancel::Context;
use crate::utils::config::DEFAULT_CHUNK_SIZE;

/// Called by a worker with the number of items it just finished.
pub type ProgressHook = Arc<dyn Fn(usize) + Send + Sync>;

/// Options for a [`Dispatcher`](super::Dispatcher) run.
#[derive(Clone)]
pub struct DispatchOpts {
    /// Number of worker threads. Must be at least 1.
    pub pool_size: usize,
    /// Task queue capacity. When None, equals `pool_size`.
    pub queue_capacity: Option<usize>,
    /// Bytes per chunk when the source is a reader.
    pub chunk_size: usize,
    /// Every blocking point of the run races this context.
    pub ctx: Context,
    pub on_progress: Option<ProgressHook>,
}

impl DispatchOpts {
    pub fn new(pool_size: usize) -> Self {
        DispatchOpts {
            pool_size,
            queue_capacity: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            ctx: Context::background(),
            on_progress: None,
        }
    }

    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.pool_size)
    }
}

impl fmt::Debug for DispatchOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchOpts")
            .field("pool_size", &self.pool_size)
            .field("queue_capacity", &self.effective_queue_capacity())
            .field("chunk_size", &self.chunk_size)
            .field("ctx", &self.ctx)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Sum of task contributions plus bookkeeping, updated concurrently by the workers.
/// Read it only after every worker has been joined.
#[derive(Debug, Default)]
pub struct AggregateCounter {
    total: AtomicI64,
    processed: AtomicUsize,
    canceled: AtomicBool,
}

impl AggregateCounter {
    pub fn add(&self, contribution: i64) {
        self.total.fetch_add(contribution, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// A worker left its loop because the context was done.
    pub fn mark_canceled(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    pub fn total(&self) -> i64 {
        self.total.load(Ordering::Acquire)
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    pub fn was_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}

/// The bounded task queue. Producer keeps `tx`; each worker gets a clone of `rx`.
pub struct TaskQueue<T> {
    pub tx: Sender<T>,
    pub rx: Receiver<T>,
}

pub fn create_task_queue<T>(capacity: usize) -> TaskQueue<T> {
    let (tx, rx) = bounded::<T>(capacity);
    TaskQueue { tx, rx }
}
