use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};
use std::io::Read;
use std::thread;

use crate::cancel::Context;
use crate::error::{DispatchError, SourceError};
use crate::types::{Outcome, Report};

use super::context::{AggregateCounter, DispatchOpts, ProgressHook, create_task_queue};
use super::producer::{ProducerExit, produce_from_channel, produce_from_iter};
use super::source::ReadChunks;
use super::worker::{join_workers, spawn_workers};

/// Fixed-size worker pool over a bounded task queue.
///
/// One producer (the calling thread) feeds the queue; `pool_size` workers apply the task
/// function and add each contribution to a shared counter. Every worker is joined before the
/// total is read, on every exit path.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    opts: DispatchOpts,
}

impl Dispatcher {
    pub fn new(pool_size: usize) -> Self {
        Dispatcher {
            opts: DispatchOpts::new(pool_size),
        }
    }

    pub fn with_opts(opts: DispatchOpts) -> Self {
        Dispatcher { opts }
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.opts.queue_capacity = Some(capacity);
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.opts.chunk_size = chunk_size;
        self
    }

    pub fn context(mut self, ctx: Context) -> Self {
        self.opts.ctx = ctx;
        self
    }

    pub fn on_progress<P>(mut self, hook: P) -> Self
    where
        P: Fn(usize) + Send + Sync + 'static,
    {
        self.opts.on_progress = Some(std::sync::Arc::new(hook) as ProgressHook);
        self
    }

    pub fn opts(&self) -> &DispatchOpts {
        &self.opts
    }

    /// Read `reader` in `chunk_size` pieces and dispatch each piece. A chunk size of 0 fails
    /// the run with [`DispatchError::InvalidChunkSize`] without reading.
    pub fn run_reader<R, F>(&self, reader: R, task_fn: F) -> Report
    where
        R: Read,
        F: Fn(Vec<u8>) -> i64 + Sync,
    {
        if self.opts.chunk_size == 0 {
            let outcome = Outcome::Failed(DispatchError::InvalidChunkSize);
            return Report::new(0, 0, self.opts.pool_size, outcome);
        }
        let chunks = ReadChunks::new(reader, self.opts.chunk_size);
        self.run_items(chunks, task_fn)
    }

    /// Dispatch every `Ok` item; the first `Err` stops the producer and fails the run.
    pub fn run_items<T, E, I, F>(&self, items: I, task_fn: F) -> Report
    where
        T: Send,
        E: Into<SourceError>,
        I: IntoIterator<Item = Result<T, E>>,
        F: Fn(T) -> i64 + Sync,
    {
        self.dispatch(task_fn, |tx, ctx| produce_from_iter(items, tx, ctx))
    }

    /// Dispatch items from a channel (e.g. a merged stream) until it closes.
    pub fn run_stream<T, F>(&self, source: &Receiver<T>, task_fn: F) -> Report
    where
        T: Send,
        F: Fn(T) -> i64 + Sync,
    {
        self.dispatch(task_fn, |tx, ctx| produce_from_channel(source, tx, ctx))
    }

    fn dispatch<T, F, P>(&self, task_fn: F, produce: P) -> Report
    where
        T: Send,
        F: Fn(T) -> i64 + Sync,
        P: FnOnce(&Sender<T>, &Context) -> (ProducerExit, usize),
    {
        let pool_size = self.opts.pool_size;
        if pool_size == 0 {
            return Report::new(0, 0, pool_size, Outcome::Failed(DispatchError::InvalidPoolSize));
        }
        let capacity = self.opts.effective_queue_capacity();
        debug!("dispatch: {} worker(s), queue capacity {}", pool_size, capacity);

        let ctx = &self.opts.ctx;
        let counter = AggregateCounter::default();
        let queue = create_task_queue::<T>(capacity);
        let done = ctx.done();

        let (exit, sent, panicked) = thread::scope(|s| {
            let handles = spawn_workers(
                s,
                &queue.rx,
                &done,
                &task_fn,
                &counter,
                self.opts.on_progress.as_ref(),
                pool_size,
            );
            // Workers hold their own receivers; ours would keep the queue open for the producer.
            drop(queue.rx);

            let (exit, sent) = produce(&queue.tx, ctx);
            // Closing the queue lets workers drain what is left and exit.
            drop(queue.tx);

            let panicked = join_workers(handles);
            (exit, sent, panicked)
        });

        let total = counter.total();
        let processed = counter.processed();
        debug!(
            "dispatch: producer sent {} item(s), workers processed {}, total {}",
            sent, processed, total
        );

        let outcome = if panicked > 0 {
            warn!("{} worker(s) panicked", panicked);
            Outcome::Failed(DispatchError::WorkerPanicked { count: panicked })
        } else {
            match exit {
                ProducerExit::Failed(e) => Outcome::Failed(DispatchError::SourceRead(e)),
                ProducerExit::Canceled(reason) => Outcome::Canceled(reason),
                ProducerExit::Exhausted | ProducerExit::WorkersGone if counter.was_canceled() => {
                    Outcome::Canceled(ctx.reason_or_canceled())
                }
                ProducerExit::Exhausted | ProducerExit::WorkersGone => Outcome::Completed,
            }
        };

        Report::new(total, processed, pool_size, outcome)
    }
}

/// Read `source` in [`DEFAULT_CHUNK_SIZE`](crate::utils::config::DEFAULT_CHUNK_SIZE) chunks,
/// apply `task_fn` to each on `pool_size` workers and sum the results.
pub fn run<R, F>(source: R, task_fn: F, pool_size: usize) -> Report
where
    R: Read,
    F: Fn(Vec<u8>) -> i64 + Sync,
{
    Dispatcher::new(pool_size).run_reader(source, task_fn)
}
