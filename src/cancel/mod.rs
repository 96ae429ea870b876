//! Cancellation context: a deadline/cancel signal with a reason, threaded through blocking calls.
//!
//! A [`Context`] is cheap to clone. Its [`done`](Context::done) receiver never yields a value;
//! it becomes ready (disconnected) once the context is canceled, so it can sit in any
//! `crossbeam_channel::select!` next to the operation it guards.

use crossbeam_channel::{Receiver, Sender, at, bounded, never, select};
use log::debug;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Why a context finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CancelReason {
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

struct Inner {
    reason: Mutex<Option<CancelReason>>,
    /// Dropped (set to `None`) on cancel; that disconnects `done_rx`.
    done_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
    deadline: Option<Instant>,
    cancelable: bool,
}

/// Deadline/cancellation signal. See the module docs.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.inner.deadline)
            .field("err", &self.err())
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

/// Cancels the context it was created with. Idempotent. Dropping it does not cancel.
#[derive(Clone)]
pub struct CancelFn {
    ctx: Context,
}

impl CancelFn {
    pub fn cancel(&self) {
        self.ctx.cancel_with(CancelReason::Canceled);
    }
}

impl Context {
    /// Root context: never done, no deadline.
    pub fn background() -> Self {
        Context {
            inner: Arc::new(Inner {
                reason: Mutex::new(None),
                done_tx: Mutex::new(None),
                done_rx: never(),
                deadline: None,
                cancelable: false,
            }),
        }
    }

    /// Child of `parent` that can be canceled explicitly.
    pub fn with_cancel(parent: &Context) -> (Context, CancelFn) {
        Self::derive(parent, parent.inner.deadline)
    }

    /// Child of `parent` that is canceled with [`CancelReason::DeadlineExceeded`] after `timeout`.
    /// A timeout too large to represent as an `Instant` means no deadline of its own.
    pub fn with_timeout(parent: &Context, timeout: Duration) -> (Context, CancelFn) {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(parent, deadline),
            None => Self::derive(parent, parent.inner.deadline),
        }
    }

    /// Child of `parent` that is canceled at `deadline` (or the parent's, if earlier).
    pub fn with_deadline(parent: &Context, deadline: Instant) -> (Context, CancelFn) {
        let deadline = match parent.inner.deadline {
            Some(parent_deadline) if parent_deadline < deadline => parent_deadline,
            _ => deadline,
        };
        Self::derive(parent, Some(deadline))
    }

    fn derive(parent: &Context, deadline: Option<Instant>) -> (Context, CancelFn) {
        let (done_tx, done_rx) = bounded::<()>(0);
        let ctx = Context {
            inner: Arc::new(Inner {
                reason: Mutex::new(None),
                done_tx: Mutex::new(Some(done_tx)),
                done_rx,
                deadline,
                cancelable: true,
            }),
        };

        if let Some(reason) = parent.err() {
            ctx.cancel_with(reason);
        } else if parent.inner.cancelable || deadline.is_some() {
            spawn_propagator(parent.clone(), ctx.clone());
        }

        let cancel = CancelFn { ctx: ctx.clone() };
        (ctx, cancel)
    }

    /// Receiver that becomes ready (disconnected) once the context is done.
    pub fn done(&self) -> Receiver<()> {
        self.inner.done_rx.clone()
    }

    /// `None` while running; the reason once done.
    pub fn err(&self) -> Option<CancelReason> {
        *self
            .inner
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Block for `dur`, or until the context is done, whichever comes first.
    pub fn sleep(&self, dur: Duration) -> Result<(), CancelReason> {
        let timer = crossbeam_channel::after(dur);
        select! {
            recv(timer) -> _ => Ok(()),
            recv(self.inner.done_rx) -> _ => Err(self.reason_or_canceled()),
        }
    }

    /// Reason to report after `done()` fired. The reason is always set before `done` fires.
    pub(crate) fn reason_or_canceled(&self) -> CancelReason {
        self.err().unwrap_or(CancelReason::Canceled)
    }

    fn cancel_with(&self, reason: CancelReason) {
        let mut slot = self
            .inner
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }
        *slot = Some(reason);
        drop(slot);
        let tx = self
            .inner
            .done_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(tx);
        debug!("context done: {}", reason);
    }
}

/// Watch the parent and the deadline on a helper thread until the child is done.
fn spawn_propagator(parent: Context, child: Context) {
    let parent_done = parent.done();
    let child_done = child.done();
    let timer = match child.inner.deadline {
        Some(deadline) => at(deadline),
        None => never(),
    };
    thread::spawn(move || {
        select! {
            recv(parent_done) -> _ => child.cancel_with(parent.reason_or_canceled()),
            recv(timer) -> _ => child.cancel_with(CancelReason::DeadlineExceeded),
            recv(child_done) -> _ => {}
        }
    });
}
