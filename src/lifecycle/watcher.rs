//! Periodic background watcher built on [`Lifecycle`].

use crossbeam_channel::{select, tick};
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::cancel::Context;
use crate::error::LifecycleError;

use super::handle::{Lifecycle, LifecycleHandle, State};

/// Runs `on_tick` every `interval` until stopped, then runs `on_cleanup` to completion before
/// the stop returns. A zero interval is rejected with [`LifecycleError::InvalidInterval`].
#[derive(Debug)]
pub struct Watcher {
    handle: LifecycleHandle,
    ticks: Arc<AtomicU64>,
}

impl Watcher {
    pub fn start<T, C>(interval: Duration, on_tick: T, on_cleanup: C) -> Result<Self, LifecycleError>
    where
        T: FnMut(u64) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        Self::start_named(
            format!("{}-watcher", env!("CARGO_PKG_NAME")),
            interval,
            on_tick,
            on_cleanup,
        )
    }

    pub fn start_named<T, C>(
        name: String,
        interval: Duration,
        mut on_tick: T,
        on_cleanup: C,
    ) -> Result<Self, LifecycleError>
    where
        T: FnMut(u64) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        if interval.is_zero() {
            return Err(LifecycleError::InvalidInterval);
        }
        let ticks = Arc::new(AtomicU64::new(0));
        let ticks_w = Arc::clone(&ticks);
        let handle = Lifecycle::builder().name(name).spawn(move |stop| {
            let ticker = tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        let n = ticks_w.fetch_add(1, Ordering::Relaxed) + 1;
                        on_tick(n);
                    }
                    recv(stop.receiver()) -> _ => {
                        debug!("watcher: stop received after {} tick(s), cleaning up", ticks_w.load(Ordering::Relaxed));
                        on_cleanup();
                        return;
                    }
                }
            }
        })?;
        Ok(Watcher { handle, ticks })
    }

    /// Ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> State {
        self.handle.state()
    }

    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        self.handle.stop()
    }

    pub fn stop_with(&mut self, ctx: &Context) -> Result<(), LifecycleError> {
        self.handle.stop_with(ctx)
    }
}
