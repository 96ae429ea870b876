use crossbeam_channel::{Receiver, select};
use log::debug;
use std::thread::{Scope, ScopedJoinHandle};

use super::context::{AggregateCounter, ProgressHook};

/// Single worker: receive items until the queue is closed and empty (or the context is done),
/// apply `task_fn`, add the contribution to the counter.
fn worker_loop<T, F>(
    worker_id: usize,
    queue: Receiver<T>,
    done: Receiver<()>,
    task_fn: &F,
    counter: &AggregateCounter,
    on_progress: Option<&ProgressHook>,
) where
    F: Fn(T) -> i64,
{
    loop {
        select! {
            recv(queue) -> msg => match msg {
                Ok(item) => {
                    counter.add(task_fn(item));
                    if let Some(hook) = on_progress {
                        hook(1);
                    }
                }
                Err(_) => break,
            },
            recv(done) -> _ => {
                debug!("worker {}: context done, leaving queue", worker_id);
                counter.mark_canceled();
                break;
            }
        }
    }
}

/// Spawn `num_workers` scoped workers on `queue`. The caller must drop its own sender so the
/// workers see the queue close, then join every handle before reading `counter`.
pub fn spawn_workers<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    queue: &Receiver<T>,
    done: &Receiver<()>,
    task_fn: &'env F,
    counter: &'env AggregateCounter,
    on_progress: Option<&'env ProgressHook>,
    num_workers: usize,
) -> Vec<ScopedJoinHandle<'scope, ()>>
where
    T: Send + 'scope,
    F: Fn(T) -> i64 + Sync,
{
    (0..num_workers)
        .map(|worker_id| {
            let queue = queue.clone();
            let done = done.clone();
            scope.spawn(move || worker_loop(worker_id, queue, done, task_fn, counter, on_progress))
        })
        .collect()
}

/// Join every worker; returns how many panicked.
pub fn join_workers(handles: Vec<ScopedJoinHandle<'_, ()>>) -> usize {
    handles
        .into_iter()
        .map(|h| h.join())
        .filter(|r| r.is_err())
        .count()
}
