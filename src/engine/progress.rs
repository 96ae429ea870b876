//! Progress counter for dispatcher runs

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

use crate::dispatch::ProgressHook;

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a counter for unknown total (shows count without percentage)
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " chunks"
    )))
}

/// Add `n` to the bar. Workers finish one chunk at a time, so the lock is held only briefly.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.lock() {
        let _ = pb.update(n);
    }
}

/// Force a refresh of the bar, e.g. once the run has finished.
pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.lock() {
        let _ = bar.refresh();
    }
}

/// Dispatcher hook that feeds the bar.
pub fn progress_hook(bar: &ProgressBar) -> ProgressHook {
    let bar = Arc::clone(bar);
    Arc::new(move |n: usize| update_progress_bar(&bar, n))
}
