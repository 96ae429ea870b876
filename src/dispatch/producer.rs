//! Producer side of the dispatcher: feed the task queue from a source.

use crossbeam_channel::{Receiver, Sender, select};
use log::{debug, warn};

use crate::cancel::{CancelReason, Context};
use crate::error::SourceError;

/// Why the producer loop stopped.
#[derive(Debug)]
pub enum ProducerExit {
    /// Natural end of input.
    Exhausted,
    /// Source failed with something other than end of input.
    Failed(SourceError),
    Canceled(CancelReason),
    /// Every worker is gone (all of them panicked or left); nothing left to feed.
    WorkersGone,
}

/// Enqueue one item, racing the context. Blocks while the queue is full.
fn enqueue<T>(item: T, tx: &Sender<T>, ctx: &Context) -> Result<(), ProducerExit> {
    let done = ctx.done();
    select! {
        send(tx, item) -> res => res.map_err(|_| ProducerExit::WorkersGone),
        recv(done) -> _ => Err(ProducerExit::Canceled(ctx.reason_or_canceled())),
    }
}

/// Drain a fallible iterator into the queue. Pulling from the iterator itself cannot be
/// interrupted, so the context is checked between items.
pub fn produce_from_iter<T, E, I>(items: I, tx: &Sender<T>, ctx: &Context) -> (ProducerExit, usize)
where
    I: IntoIterator<Item = Result<T, E>>,
    E: Into<SourceError>,
{
    let mut sent = 0_usize;
    for result in items {
        if let Some(reason) = ctx.err() {
            return (ProducerExit::Canceled(reason), sent);
        }
        match result {
            Ok(item) => {
                if let Err(exit) = enqueue(item, tx, ctx) {
                    return (exit, sent);
                }
                sent += 1;
            }
            Err(e) => {
                let e: SourceError = e.into();
                warn!("source failed after {} item(s): {}", sent, e);
                return (ProducerExit::Failed(e), sent);
            }
        }
    }
    debug!("source exhausted after {} item(s)", sent);
    (ProducerExit::Exhausted, sent)
}

/// Forward a channel into the queue until it closes. Both the receive and the send race the context.
pub fn produce_from_channel<T>(
    source: &Receiver<T>,
    tx: &Sender<T>,
    ctx: &Context,
) -> (ProducerExit, usize) {
    let done = ctx.done();
    let mut sent = 0_usize;
    loop {
        let item = select! {
            recv(source) -> msg => match msg {
                Ok(item) => item,
                Err(_) => break,
            },
            recv(done) -> _ => return (ProducerExit::Canceled(ctx.reason_or_canceled()), sent),
        };
        if let Err(exit) = enqueue(item, tx, ctx) {
            return (exit, sent);
        }
        sent += 1;
    }
    debug!("source stream closed after {} item(s)", sent);
    (ProducerExit::Exhausted, sent)
}
