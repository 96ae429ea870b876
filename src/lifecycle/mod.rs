//! Lifecycle controller: start one background operation, stop it, and block until its cleanup
//! has finished.
//!
//! The caller obligation is that the work function returns once the [`StopSignal`] fires. A work
//! function that ignores the signal makes `stop` block forever.

pub mod handle;
pub mod watcher;

pub use handle::{Lifecycle, LifecycleHandle, State, StopSignal};
pub use watcher::Watcher;
