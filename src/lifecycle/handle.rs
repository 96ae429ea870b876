use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded, select};
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::cancel::Context;
use crate::error::LifecycleError;

/// Lifecycle of one background operation. Only moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Running,
    StopRequested,
    Stopped,
}

impl State {
    fn from_u8(v: u8) -> State {
        match v {
            0 => State::Running,
            1 => State::StopRequested,
            _ => State::Stopped,
        }
    }
}

#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        StateCell(AtomicU8::new(State::Running as u8))
    }

    fn get(&self) -> State {
        State::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: State) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// The background side of the stop signal. Nothing is ever sent; the channel disconnects when
/// the controller requests a stop.
#[derive(Clone, Debug)]
pub struct StopSignal {
    rx: Receiver<()>,
}

impl StopSignal {
    /// For use in `crossbeam_channel::select!`; ready once a stop was requested.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Block until a stop is requested.
    pub fn wait(&self) {
        let _ = self.rx.recv();
    }

    /// Block up to `timeout`; true if a stop was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(
            self.rx.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}

/// Owned by the background thread; dropping it releases the completion barrier. Dropped after
/// the work function returns or unwinds, so the barrier is released on every exit path.
struct CompletionGuard {
    done_tx: Option<Sender<()>>,
    name: String,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        drop(self.done_tx.take());
        debug!("{}: completion barrier released", self.name);
    }
}

/// Starts background operations.
#[derive(Clone, Debug)]
pub struct Lifecycle {
    name: String,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle {
            name: format!("{}-lifecycle", env!("CARGO_PKG_NAME")),
        }
    }
}

impl Lifecycle {
    pub fn builder() -> Self {
        Self::default()
    }

    /// Thread name; also used as the log prefix.
    pub fn name<N: Into<String>>(self, name: N) -> Self {
        Lifecycle { name: name.into() }
    }

    /// Start `work_fn` on a new thread with the default name.
    pub fn start<F>(work_fn: F) -> Result<LifecycleHandle, LifecycleError>
    where
        F: FnOnce(StopSignal) + Send + 'static,
    {
        Self::builder().spawn(work_fn)
    }

    /// Start `work_fn` on a new thread. `work_fn` must watch the [`StopSignal`] and return once
    /// its cleanup is done; [`LifecycleHandle::stop`] blocks until then.
    pub fn spawn<F>(self, work_fn: F) -> Result<LifecycleHandle, LifecycleError>
    where
        F: FnOnce(StopSignal) + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let (done_tx, done_rx) = bounded::<()>(0);
        let state = Arc::new(StateCell::new());

        let guard = CompletionGuard {
            done_tx: Some(done_tx),
            name: self.name.clone(),
        };
        let signal = StopSignal { rx: stop_rx };
        let thread = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                let _guard = guard;
                work_fn(signal);
            })?;
        debug!("{}: started", self.name);

        Ok(LifecycleHandle {
            name: self.name,
            stop_tx: Some(stop_tx),
            done_rx,
            thread: Some(thread),
            state,
        })
    }
}

/// Caller-facing handle for one background operation.
///
/// `stop` closes the stop signal once and blocks until the background thread has released the
/// completion barrier, i.e. until its cleanup has run. Dropping a handle that was never stopped
/// stops it.
#[derive(Debug)]
pub struct LifecycleHandle {
    name: String,
    stop_tx: Option<Sender<()>>,
    done_rx: Receiver<()>,
    thread: Option<JoinHandle<()>>,
    state: Arc<StateCell>,
}

impl LifecycleHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> State {
        self.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state() == State::Running
    }

    /// Request a stop and block until cleanup has finished.
    ///
    /// Returns [`LifecycleError::AlreadyStopped`] when called again after a completed stop and
    /// [`LifecycleError::Panicked`] if the background operation panicked.
    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        self.request_stop()?;
        debug!("{}: waiting for cleanup", self.name);
        // Nothing is sent; the guard's drop disconnects the channel.
        let _ = self.done_rx.recv();
        self.finish()
    }

    /// Like [`stop`](Self::stop), but gives up waiting when `ctx` is done. The stop signal stays
    /// closed; call `stop` later to finish waiting.
    pub fn stop_with(&mut self, ctx: &Context) -> Result<(), LifecycleError> {
        self.request_stop()?;
        let barrier = self.done_rx.clone();
        let done = ctx.done();
        select! {
            recv(barrier) -> _ => self.finish(),
            recv(done) -> _ => {
                let reason = ctx.reason_or_canceled();
                warn!("{}: stop abandoned before cleanup finished ({})", self.name, reason);
                Err(LifecycleError::Canceled(reason))
            }
        }
    }

    /// Close the stop signal, at most once.
    fn request_stop(&mut self) -> Result<(), LifecycleError> {
        if self.thread.is_none() {
            return Err(LifecycleError::AlreadyStopped);
        }
        if let Some(tx) = self.stop_tx.take() {
            self.state.set(State::StopRequested);
            drop(tx);
            debug!("{}: stop requested", self.name);
        }
        Ok(())
    }

    /// Barrier released: join the thread and mark the handle stopped.
    fn finish(&mut self) -> Result<(), LifecycleError> {
        let Some(thread) = self.thread.take() else {
            return Err(LifecycleError::AlreadyStopped);
        };
        let joined = thread.join();
        self.state.set(State::Stopped);
        match joined {
            Ok(()) => {
                debug!("{}: stopped", self.name);
                Ok(())
            }
            Err(_) => {
                warn!("{}: background operation panicked", self.name);
                Err(LifecycleError::Panicked)
            }
        }
    }
}

impl Drop for LifecycleHandle {
    fn drop(&mut self) {
        if self.thread.is_some()
            && let Err(e) = self.stop()
        {
            warn!("{}: stop on drop: {}", self.name, e);
        }
    }
}
