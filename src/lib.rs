//! Taskyard: concurrent task-dispatch toolkit
//!
//! - [`merge`]: fan in several channel receivers into one; the output closes only after every
//!   input has closed.
//! - [`dispatch`]: fixed-size worker pool over a bounded queue with an atomic aggregate.
//! - [`lifecycle`]: start a background operation, stop it, and block until its cleanup is done.
//! - [`cancel`]: deadline/cancellation contexts raced at every blocking point of the above.

pub mod cancel;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod merge;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use cancel::{CancelFn, CancelReason, Context};
pub use dispatch::{DispatchOpts, Dispatcher, run};
pub use error::{DispatchError, LifecycleError};
pub use lifecycle::{Lifecycle, LifecycleHandle, State, StopSignal, Watcher};
pub use merge::{MergeHandle, MergeStats, Merger, merge, merge2};

/// Result alias used by the CLI and convenience entry points
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Merge `streams` and dispatch the merged items on `pool_size` workers. Fails only if the
/// merge thread cannot be spawned.
///
/// ```ignore
/// let report = taskyard::merge_and_dispatch(vec![rx1, rx2], |v: i64| v, 4, &Context::background())?;
/// assert!(report.is_completed());
/// ```
pub fn merge_and_dispatch<T, F>(
    streams: Vec<crossbeam_channel::Receiver<T>>,
    task_fn: F,
    pool_size: usize,
    ctx: &Context,
) -> std::io::Result<Report>
where
    T: Send + 'static,
    F: Fn(T) -> i64 + Sync,
{
    let merged = merge(streams)?;
    Ok(Dispatcher::new(pool_size)
        .context(ctx.clone())
        .run_stream(&merged, task_fn))
}
